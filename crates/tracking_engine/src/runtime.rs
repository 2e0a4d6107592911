//! TrackerService - async single-writer runtime around [`Tracker`]
//!
//! 控制命令和位置样本共用一条有序通道，严格按到达顺序逐个处理：
//! 先入队的样本总在其后的命令之前生效，与 pause 同一时刻仍在途中的样本
//! 排在 pause 之后，按暂停状态处理。
//! 另有两个定时器：信号丢失看门狗（仅 active 时启用）和只刷新墙钟时间的显示 ticker。

use chrono::Utc;
use contracts::{
    AcquisitionStatus, ActivitySummary, LiveMetrics, PathView, PositionSample, ProviderError,
    SessionId, SessionState, TrackUpdate, TrackerConfig,
};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, TrackerError};
use crate::tracker::{SampleOutcome, Tracker};

const INPUT_CAPACITY: usize = 256;
const EVENT_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<Result<T>>;

enum Control {
    Start(Reply<SessionId>),
    Pause(Reply<()>),
    Resume(Reply<()>),
    Stop(Reply<ActivitySummary>),
    Cancel(Reply<()>),
    Reset(Reply<()>),
    ProviderError(ProviderError),
    Path(oneshot::Sender<PathView>),
}

/// One entry of the ordered input queue
enum Input {
    Sample(PositionSample),
    Control(Control),
}

/// Discrete notifications for collaborators
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    AcquisitionChanged(AcquisitionStatus),
    /// No sample accepted within `lost_after_s` while active
    SignalLost {
        session_id: SessionId,
        silent_for_s: f64,
    },
    SignalRestored {
        session_id: SessionId,
    },
}

/// Spawns the tracker task
pub struct TrackerService;

impl TrackerService {
    /// Spawn on the current runtime.
    ///
    /// `render_tx` receives one [`TrackUpdate`] per accepted sample (dropped when
    /// full); `summary_tx` receives the summary of every completed session.
    pub fn spawn(
        config: TrackerConfig,
        render_tx: Option<mpsc::Sender<TrackUpdate>>,
        summary_tx: Option<mpsc::Sender<ActivitySummary>>,
    ) -> TrackerHandle {
        let (input_tx, input_rx) = mpsc::channel(INPUT_CAPACITY);
        let tracker = Tracker::new(config);
        let (metrics_tx, metrics_rx) = watch::channel(tracker.metrics());
        let (events_tx, _) = broadcast::channel(EVENT_CAPACITY);

        let worker = ServiceLoop {
            tracker,
            render_tx,
            summary_tx,
            metrics_tx,
            events_tx: events_tx.clone(),
            started: None,
            elapsed_wall_s: 0.0,
            last_progress: Instant::now(),
        };
        let task = tokio::spawn(worker.run(input_rx));

        TrackerHandle {
            input_tx,
            metrics_rx,
            events_tx,
            task: Some(task),
        }
    }
}

/// Caller side of a running tracker
pub struct TrackerHandle {
    input_tx: mpsc::Sender<Input>,
    metrics_rx: watch::Receiver<LiveMetrics>,
    events_tx: broadcast::Sender<TrackerEvent>,
    task: Option<JoinHandle<()>>,
}

impl TrackerHandle {
    async fn enqueue(&self, input: Input) -> Result<()> {
        self.input_tx
            .send(input)
            .await
            .map_err(|_| TrackerError::ServiceClosed)
    }

    /// Queue a command behind everything already submitted and wait for it
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Control) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(Input::Control(make(reply))).await?;
        rx.await.map_err(|_| TrackerError::ServiceClosed)?
    }

    pub async fn start(&self) -> Result<SessionId> {
        self.request(Control::Start).await
    }

    pub async fn pause(&self) -> Result<()> {
        self.request(Control::Pause).await
    }

    pub async fn resume(&self) -> Result<()> {
        self.request(Control::Resume).await
    }

    /// Complete the session; the summary is also forwarded to persistence
    pub async fn stop(&self) -> Result<ActivitySummary> {
        self.request(Control::Stop).await
    }

    pub async fn cancel(&self) -> Result<()> {
        self.request(Control::Cancel).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.request(Control::Reset).await
    }

    pub async fn report_provider_error(&self, error: ProviderError) -> Result<()> {
        self.enqueue(Input::Control(Control::ProviderError(error))).await
    }

    /// Queue a sample (waits for queue space, not for processing)
    pub async fn submit_sample(&self, sample: PositionSample) -> Result<()> {
        self.enqueue(Input::Sample(sample)).await
    }

    /// Path snapshot after every input queued before this call
    pub async fn path(&self) -> Result<PathView> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(Input::Control(Control::Path(reply))).await?;
        rx.await.map_err(|_| TrackerError::ServiceClosed)
    }

    /// Latest published live metrics
    pub fn metrics(&self) -> LiveMetrics {
        self.metrics_rx.borrow().clone()
    }

    pub fn subscribe_metrics(&self) -> watch::Receiver<LiveMetrics> {
        self.metrics_rx.clone()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events_tx.subscribe()
    }

    /// Close the channels and wait for the task to exit
    pub async fn shutdown(mut self) {
        let task = self.task.take();
        drop(self);
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!(error = %e, "tracker task panicked");
            }
        }
    }
}

struct ServiceLoop {
    tracker: Tracker,
    render_tx: Option<mpsc::Sender<TrackUpdate>>,
    summary_tx: Option<mpsc::Sender<ActivitySummary>>,
    metrics_tx: watch::Sender<LiveMetrics>,
    events_tx: broadcast::Sender<TrackerEvent>,
    /// Wall-clock start of the live session
    started: Option<Instant>,
    elapsed_wall_s: f64,
    /// Start, resume or last accepted sample; the watchdog counts from here
    last_progress: Instant,
}

impl ServiceLoop {
    async fn run(mut self, mut input_rx: mpsc::Receiver<Input>) {
        let lost_after = Duration::from_secs_f64(self.tracker.config().signal.lost_after_s);
        let mut ticker =
            tokio::time::interval(Duration::from_millis(self.tracker.config().display_tick_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(kind = %self.tracker.config().activity_kind, "tracker service started");

        loop {
            let watchdog_armed =
                self.tracker.state() == SessionState::Active && !self.tracker.is_signal_lost();
            let deadline = self.last_progress + lost_after;

            tokio::select! {
                biased;

                input = input_rx.recv() => match input {
                    Some(Input::Sample(sample)) => self.handle_sample(sample),
                    Some(Input::Control(control)) => self.handle_control(control),
                    None => {
                        debug!("input channel closed");
                        break;
                    }
                },

                _ = tokio::time::sleep_until(deadline), if watchdog_armed => {
                    self.handle_watchdog(lost_after);
                }

                _ = ticker.tick() => {
                    if self.tracker.state().is_live() {
                        self.publish();
                    }
                }
            }
        }

        info!(state = %self.tracker.state(), "tracker service stopped");
    }

    fn handle_control(&mut self, control: Control) {
        let from = self.tracker.state();
        let acquisition = self.tracker.acquisition();

        match control {
            Control::Start(reply) => {
                let result = self.tracker.start(Utc::now());
                if result.is_ok() {
                    let now = Instant::now();
                    self.started = Some(now);
                    self.elapsed_wall_s = 0.0;
                    self.last_progress = now;
                }
                self.settle(from, acquisition);
                let _ = reply.send(result);
            }
            Control::Pause(reply) => {
                let result = self.tracker.pause();
                self.settle(from, acquisition);
                let _ = reply.send(result);
            }
            Control::Resume(reply) => {
                let result = self.tracker.resume();
                if result.is_ok() {
                    self.last_progress = Instant::now();
                }
                self.settle(from, acquisition);
                let _ = reply.send(result);
            }
            Control::Stop(reply) => {
                let result = self.tracker.stop();
                if let Ok(summary) = &result {
                    self.freeze_elapsed();
                    self.forward_summary(summary);
                }
                self.settle(from, acquisition);
                let _ = reply.send(result);
            }
            Control::Cancel(reply) => {
                let result = self.tracker.cancel();
                if result.is_ok() {
                    self.clear_elapsed();
                }
                self.settle(from, acquisition);
                let _ = reply.send(result);
            }
            Control::Reset(reply) => {
                let result = self.tracker.reset();
                if result.is_ok() {
                    self.clear_elapsed();
                }
                self.settle(from, acquisition);
                let _ = reply.send(result);
            }
            Control::ProviderError(error) => {
                self.tracker.on_provider_error(error);
                self.settle(from, acquisition);
            }
            Control::Path(reply) => {
                let _ = reply.send(self.tracker.path());
            }
        }
    }

    /// Emit change events and publish before the caller is answered
    fn settle(&self, from: SessionState, acquisition: AcquisitionStatus) {
        let to = self.tracker.state();
        if to != from {
            self.emit(TrackerEvent::StateChanged { from, to });
        }
        if self.tracker.acquisition() != acquisition {
            self.emit(TrackerEvent::AcquisitionChanged(self.tracker.acquisition()));
        }
        self.publish();
    }

    #[instrument(name = "tracker_service_sample", level = "trace", skip_all)]
    fn handle_sample(&mut self, sample: PositionSample) {
        let acquisition = self.tracker.acquisition();
        let was_lost = self.tracker.is_signal_lost();

        let outcome = self.tracker.on_sample(sample);

        if self.tracker.acquisition() != acquisition {
            self.emit(TrackerEvent::AcquisitionChanged(self.tracker.acquisition()));
        }

        if let SampleOutcome::Accepted { .. } = outcome {
            self.last_progress = Instant::now();
            if was_lost {
                if let Some(session_id) = self.tracker.session_id().cloned() {
                    self.emit(TrackerEvent::SignalRestored { session_id });
                }
            }
            self.notify_renderers(&sample);
        }

        if outcome != SampleOutcome::Ignored {
            self.publish();
        }
    }

    fn handle_watchdog(&mut self, lost_after: Duration) {
        if !self.tracker.mark_signal_lost() {
            return;
        }
        if let Some(session_id) = self.tracker.session_id().cloned() {
            self.emit(TrackerEvent::SignalLost {
                session_id,
                silent_for_s: lost_after.as_secs_f64(),
            });
        }
        self.publish();
    }

    /// Fire-and-forget: a full renderer queue drops this update
    fn notify_renderers(&mut self, sample: &PositionSample) {
        let Some(tx) = &self.render_tx else {
            return;
        };
        let (Some(session_id), Some(bounds)) =
            (self.tracker.session_id().cloned(), self.tracker.bounds())
        else {
            return;
        };

        let update = TrackUpdate {
            session_id,
            position: sample.point(),
            path: self.tracker.path(),
            bounds,
            metrics: self.snapshot(),
        };

        match tx.try_send(update) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics::counter!("tracker_render_updates_dropped_total").increment(1);
                debug!("render queue full, update dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("render channel closed, renderer notifications disabled");
                self.render_tx = None;
            }
        }
    }

    fn forward_summary(&self, summary: &ActivitySummary) {
        let Some(tx) = &self.summary_tx else {
            return;
        };
        if let Err(e) = tx.try_send(summary.clone()) {
            metrics::counter!("tracker_summaries_dropped_total").increment(1);
            error!(
                session_id = %summary.session_id,
                error = %e,
                "failed to hand summary to persistence"
            );
        }
    }

    fn clear_elapsed(&mut self) {
        self.started = None;
        self.elapsed_wall_s = 0.0;
    }

    fn freeze_elapsed(&mut self) {
        if let Some(started) = self.started.take() {
            self.elapsed_wall_s = started.elapsed().as_secs_f64();
        }
    }

    fn snapshot(&self) -> LiveMetrics {
        let mut metrics = self.tracker.metrics();
        metrics.elapsed_wall_s = match self.started {
            Some(started) => started.elapsed().as_secs_f64(),
            None => self.elapsed_wall_s,
        };
        metrics
    }

    fn publish(&self) {
        self.metrics_tx.send_replace(self.snapshot());
    }

    fn emit(&self, event: TrackerEvent) {
        // no subscribers is fine
        let _ = self.events_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EQUATOR_M_PER_DEG: f64 = 111_194.93;

    fn east(meters: f64, t: f64) -> PositionSample {
        PositionSample::new(0.0, meters / EQUATOR_M_PER_DEG, 5.0, t).with_altitude(0.0)
    }

    async fn wait_path_len(handle: &TrackerHandle, len: usize) -> LiveMetrics {
        let mut rx = handle.subscribe_metrics();
        let metrics = rx
            .wait_for(|m| m.path_len >= len)
            .await
            .expect("tracker alive");
        metrics.clone()
    }

    #[tokio::test]
    async fn test_lifecycle_through_handle() {
        let (summary_tx, mut summary_rx) = mpsc::channel(4);
        let handle = TrackerService::spawn(TrackerConfig::default(), None, Some(summary_tx));

        let id = handle.start().await.unwrap();
        for (i, m) in [0.0, 75.0, 150.0].into_iter().enumerate() {
            handle.submit_sample(east(m, i as f64 * 10.0)).await.unwrap();
        }
        let metrics = wait_path_len(&handle, 3).await;
        assert!((metrics.distance_m - 150.0).abs() < 0.5);
        assert_eq!(metrics.session_id.as_ref(), Some(&id));

        let summary = handle.stop().await.unwrap();
        assert_eq!(summary.path.len(), 3);

        let persisted = summary_rx.recv().await.unwrap();
        assert_eq!(persisted, summary);
        assert_eq!(handle.metrics().state, SessionState::Completed);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_illegal_command_reported() {
        let handle = TrackerService::spawn(TrackerConfig::default(), None, None);
        let err = handle.pause().await.unwrap_err();
        assert!(err.is_illegal_transition());
        assert_eq!(handle.metrics().state, SessionState::Idle);
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_stop_processes_queued_samples_first() {
        let handle = TrackerService::spawn(TrackerConfig::default(), None, None);
        handle.start().await.unwrap();
        for (i, m) in [0.0, 50.0, 100.0, 150.0].into_iter().enumerate() {
            handle.submit_sample(east(m, i as f64 * 10.0)).await.unwrap();
        }

        let summary = handle.stop().await.unwrap();
        assert_eq!(summary.path.len(), 4);
        assert!((summary.distance_m - 150.0).abs() < 0.5);
        assert_eq!(summary.duration_s, 30.0);
        assert_eq!(handle.metrics().counters.ignored, 0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_pause_after_queued_samples_keeps_their_distance() {
        let handle = TrackerService::spawn(TrackerConfig::default(), None, None);
        handle.start().await.unwrap();
        for (i, m) in [0.0, 50.0, 100.0].into_iter().enumerate() {
            handle.submit_sample(east(m, i as f64 * 10.0)).await.unwrap();
        }
        handle.pause().await.unwrap();

        let metrics = handle.metrics();
        assert_eq!(metrics.state, SessionState::Paused);
        assert_eq!(metrics.path_len, 3);
        assert!((metrics.distance_m - 100.0).abs() < 0.5);
        assert_eq!(metrics.active_duration_s, 20.0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_sample_in_flight_with_pause_is_paused() {
        let handle = TrackerService::spawn(TrackerConfig::default(), None, None);
        handle.start().await.unwrap();
        handle.submit_sample(east(0.0, 0.0)).await.unwrap();

        // pause is queued on the first poll, the sample right behind it
        let (paused, submitted) =
            tokio::join!(handle.pause(), handle.submit_sample(east(50.0, 10.0)));
        paused.unwrap();
        submitted.unwrap();

        let path = handle.path().await.unwrap();
        assert_eq!(path.len(), 2);
        let metrics = handle.metrics();
        assert_eq!(metrics.state, SessionState::Paused);
        assert_eq!(metrics.distance_m, 0.0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_cancel_never_produces_summary() {
        let (summary_tx, mut summary_rx) = mpsc::channel(4);
        let handle = TrackerService::spawn(TrackerConfig::default(), None, Some(summary_tx));

        handle.start().await.unwrap();
        handle.submit_sample(east(0.0, 0.0)).await.unwrap();
        handle.submit_sample(east(30.0, 10.0)).await.unwrap();
        wait_path_len(&handle, 2).await;
        handle.cancel().await.unwrap();

        let metrics = handle.metrics();
        assert_eq!(metrics.state, SessionState::Cancelled);
        assert_eq!(metrics.distance_m, 0.0);
        assert!(handle.stop().await.is_err());

        handle.shutdown().await;
        assert!(summary_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_accepted_samples_reach_renderer_channel() {
        let (render_tx, mut render_rx) = mpsc::channel(8);
        let handle = TrackerService::spawn(TrackerConfig::default(), Some(render_tx), None);

        handle.start().await.unwrap();
        handle.submit_sample(east(0.0, 0.0)).await.unwrap();
        handle
            .submit_sample(PositionSample::new(0.0, 0.0, 99.0, 5.0))
            .await
            .unwrap();
        handle.submit_sample(east(20.0, 10.0)).await.unwrap();

        let first = render_rx.recv().await.unwrap();
        let second = render_rx.recv().await.unwrap();
        assert_eq!(first.path.len(), 1);
        assert_eq!(second.path.len(), 2);
        assert!((second.metrics.distance_m - 20.0).abs() < 0.1);
        assert!(second.bounds.east > second.bounds.west);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_lost_raised_without_state_change() {
        let handle = TrackerService::spawn(TrackerConfig::default(), None, None);
        let mut events = handle.subscribe_events();

        handle.start().await.unwrap();
        handle.submit_sample(east(0.0, 0.0)).await.unwrap();
        wait_path_len(&handle, 1).await;

        tokio::time::sleep(Duration::from_secs(16)).await;

        let mut lost = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event, TrackerEvent::SignalLost { .. }) {
                lost = true;
            }
        }
        assert!(lost, "signal lost event not emitted");

        let metrics = handle.metrics();
        assert!(metrics.signal_lost);
        assert_eq!(metrics.state, SessionState::Active);

        handle.submit_sample(east(10.0, 20.0)).await.unwrap();
        let mut rx = handle.subscribe_metrics();
        rx.wait_for(|m| !m.signal_lost).await.unwrap();

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_signal_lost_while_paused() {
        let handle = TrackerService::spawn(TrackerConfig::default(), None, None);
        handle.start().await.unwrap();
        handle.pause().await.unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;

        assert!(!handle.metrics().signal_lost);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_display_tick_refreshes_elapsed() {
        let handle = TrackerService::spawn(TrackerConfig::default(), None, None);
        handle.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let elapsed = handle.metrics().elapsed_wall_s;
        assert!(elapsed >= 2.9, "elapsed {elapsed}");
        assert_eq!(handle.metrics().distance_m, 0.0);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_provider_error_emits_acquisition_change() {
        let handle = TrackerService::spawn(TrackerConfig::default(), None, None);
        let mut events = handle.subscribe_events();
        handle.start().await.unwrap();

        handle
            .report_provider_error(ProviderError::PositionUnavailable)
            .await
            .unwrap();
        let mut rx = handle.subscribe_metrics();
        let metrics = rx
            .wait_for(|m| m.acquisition == AcquisitionStatus::PositionUnavailable)
            .await
            .unwrap()
            .clone();
        assert_eq!(metrics.state, SessionState::Active);

        let mut saw_change = false;
        while let Ok(event) = events.try_recv() {
            if event == TrackerEvent::AcquisitionChanged(AcquisitionStatus::PositionUnavailable) {
                saw_change = true;
            }
        }
        assert!(saw_change);
        handle.shutdown().await;
    }
}
