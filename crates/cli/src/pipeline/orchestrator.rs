//! Pipeline orchestrator - coordinates all components.
//!
//! 定位源 -> ingestion -> TrackerService -> (渲染器分发 | 持久化)。
//! 样本时间轴上的控制脚本在样本提交之前生效。

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{
    ActivityKind, ActivitySummary, LocationSource, TrackUpdate, TrackerBlueprint,
};
use ingestion::{
    BackpressureConfig, IngestionPipeline, LocationUpdate, ReplayConfig, ReplayLocationSource,
    SimulatedLocationSource, SimulatedSourceConfig,
};
use observability::{
    record_activity_completed, record_fix_received, record_live_metrics,
    TrackingMetricsAggregator,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use tracking_engine::{TrackerEvent, TrackerHandle, TrackerService};

use super::{ControlAction, ControlScript, RunReport};

/// Render queue between the tracker and the dispatcher
const RENDER_BUFFER: usize = 64;
const SUMMARY_BUFFER: usize = 4;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Where fixes come from
#[derive(Debug, Clone)]
pub enum SourceSelection {
    /// JSONL replay file
    Replay { path: PathBuf, speed: f64 },
    /// Built-in route simulator
    Simulate { samples: usize, realtime: f64 },
}

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Loaded tracker configuration (CLI overrides already applied)
    pub blueprint: TrackerBlueprint,

    pub source: SourceSelection,

    /// Lifecycle commands on the sample clock
    pub control: ControlScript,

    /// Pipeline timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Write the summary JSON here
    pub summary_out: Option<PathBuf>,
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Record one activity until the source is exhausted, the control script
    /// stops it, the timeout fires or `shutdown` resolves.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<RunReport> {
        let start_time = Instant::now();
        let PipelineConfig {
            blueprint,
            source,
            mut control,
            timeout,
            metrics_port,
            summary_out,
        } = self.config;

        // Initialize Metrics (optional)
        if let Some(port) = metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        // Location source
        let location_source = build_source(&source, blueprint.tracker.activity_kind)?;
        let source_name = location_source.source_name().to_string();
        let mut ingestion = IngestionPipeline::with_config(BackpressureConfig::new(
            blueprint.ingestion.channel_capacity,
            blueprint.ingestion.drop_policy,
        ));
        ingestion
            .register_source(location_source, None)
            .context("Failed to register location source")?;
        let updates = ingestion
            .take_receiver()
            .context("Failed to get ingestion receiver")?;

        info!(source = %source_name, "Ingestion pipeline configured");

        // Setup Dispatcher
        let (render_tx, render_rx) = mpsc::channel::<TrackUpdate>(RENDER_BUFFER);
        if blueprint.renderers.is_empty() {
            warn!("No renderers configured - track updates will be dropped");
        }
        let dispatcher = dispatcher::create_dispatcher(blueprint.renderers.clone(), render_rx)
            .await
            .context("Failed to create dispatcher")?;
        let dispatcher_task = dispatcher.spawn();

        info!(renderers = blueprint.renderers.len(), "Dispatcher started");

        // Persistence
        let (summary_tx, writer) = match &blueprint.store {
            Some(store) => {
                let (tx, rx) = mpsc::channel::<ActivitySummary>(SUMMARY_BUFFER);
                let writer = dispatcher::create_summary_writer(store, rx)
                    .context("Failed to create summary writer")?;
                (Some(tx), Some(writer))
            }
            None => {
                debug!("No store configured - summary is not persisted");
                (None, None)
            }
        };

        // Tracker
        let handle = TrackerService::spawn(blueprint.to_tracker_config(), Some(render_tx), summary_tx);
        let mut metrics_rx = handle.subscribe_metrics();
        let mut events = handle.subscribe_events();

        let session_id = handle.start().await.context("Failed to start session")?;
        info!(
            session_id = %session_id,
            kind = %blueprint.tracker.activity_kind,
            control_steps = control.len(),
            "Activity started"
        );

        ingestion.start_all();

        let mut aggregator = TrackingMetricsAggregator::new();
        let mut clock = SampleClock::default();
        let mut summary = None;

        let deadline = async move {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(deadline);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Ok(LocationUpdate::Sample(sample)) => {
                        aggregator.record_fix(sample.accuracy);
                        record_fix_received(&source_name, sample.accuracy);

                        let elapsed = clock.elapsed(sample.captured_at);
                        if let Some(stopped) = apply_due_controls(&handle, &mut control, elapsed).await? {
                            summary = Some(stopped);
                            break;
                        }

                        handle.submit_sample(sample).await?;
                    }
                    Ok(LocationUpdate::ProviderError(error)) => {
                        handle.report_provider_error(error).await?;
                    }
                    Err(_) => {
                        info!(fixes = aggregator.fixes_received, "Location source exhausted");
                        break;
                    }
                },

                changed = metrics_rx.changed() => {
                    if changed.is_err() {
                        warn!("Tracker metrics channel closed");
                        break;
                    }
                    let live = metrics_rx.borrow_and_update().clone();
                    aggregator.update(&live);
                    record_live_metrics(&live);
                }

                event = events.recv() => match event {
                    Ok(event) => log_event(&event),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Tracker event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },

                _ = &mut deadline => {
                    warn!(timeout_secs = timeout.map(|t| t.as_secs()), "Pipeline timed out");
                    break;
                }

                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping activity...");
                    break;
                }
            }
        }

        if !control.is_empty() {
            debug!(remaining = control.len(), "Control steps never reached");
        }

        // Shutdown
        info!("Shutting down pipeline...");
        ingestion.stop_all();

        let summary = match summary {
            Some(summary) => Some(summary),
            None => finish(&handle).await?,
        };

        let last = handle.metrics();
        aggregator.update(&last);
        if let Some(summary) = &summary {
            record_activity_completed(summary);
        }
        let ingestion_metrics = ingestion.metrics().snapshot();

        // Dropping the tracker closes the render and summary channels
        handle.shutdown().await;

        let renderers = match tokio::time::timeout(DRAIN_TIMEOUT, dispatcher_task).await {
            Ok(Ok(renderers)) => renderers,
            Ok(Err(e)) => {
                warn!(error = %e, "Dispatcher task failed");
                Vec::new()
            }
            Err(_) => {
                warn!("Dispatcher did not drain in time");
                Vec::new()
            }
        };

        if let Some(writer) = writer {
            writer.join().await;
        }

        if let (Some(path), Some(summary)) = (&summary_out, &summary) {
            write_summary(path, summary)?;
        }

        let report = RunReport {
            source: source_name,
            session_id: last.session_id.clone().or(Some(session_id)),
            final_state: last.state,
            summary,
            tracking: aggregator.summary(),
            ingestion: ingestion_metrics,
            renderers,
            duration: start_time.elapsed(),
        };

        info!(
            duration_secs = report.duration.as_secs_f64(),
            completed = report.summary.is_some(),
            "Pipeline shutdown complete"
        );

        Ok(report)
    }
}

/// Sample-clock bookkeeping for the control script
#[derive(Debug, Default)]
struct SampleClock {
    first_at: Option<f64>,
}

impl SampleClock {
    /// Seconds since the first fix seen
    fn elapsed(&mut self, captured_at: f64) -> f64 {
        let first = *self.first_at.get_or_insert(captured_at);
        (captured_at - first).max(0.0)
    }
}

/// Fire every control step that is due before the next sample.
///
/// The tracker applies inputs in arrival order, so a step lands between the
/// same two fixes it was scheduled between. Returns the summary when a
/// `stop` step completes the session.
async fn apply_due_controls(
    handle: &TrackerHandle,
    control: &mut ControlScript,
    elapsed_s: f64,
) -> Result<Option<ActivitySummary>> {
    while let Some(action) = control.next_due(elapsed_s) {
        info!(action = %action, at_s = elapsed_s, "Applying control step");
        let result = match action {
            ControlAction::Pause => handle.pause().await.map(|_| None),
            ControlAction::Resume => handle.resume().await.map(|_| None),
            ControlAction::Stop => handle.stop().await.map(Some),
        };

        match result {
            Ok(Some(summary)) => return Ok(Some(summary)),
            Ok(None) => {}
            Err(e) if e.is_illegal_transition() => {
                warn!(action = %action, error = %e, "Control step skipped");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(None)
}

/// Stop the session if it is still live
async fn finish(handle: &TrackerHandle) -> Result<Option<ActivitySummary>> {
    match handle.stop().await {
        Ok(summary) => Ok(Some(summary)),
        Err(e) if e.is_illegal_transition() => {
            warn!(error = %e, "No live session to stop");
            Ok(None)
        }
        Err(e) => Err(e).context("Failed to stop session"),
    }
}

fn build_source(
    selection: &SourceSelection,
    kind: ActivityKind,
) -> Result<Box<dyn LocationSource>> {
    match selection {
        SourceSelection::Replay { path, speed } => {
            let source = ReplayLocationSource::load(
                path,
                ReplayConfig {
                    speed_multiplier: *speed,
                },
            )
            .with_context(|| format!("Failed to load replay from {}", path.display()))?;
            info!(path = %path.display(), events = source.event_count(), "Running in REPLAY mode");
            Ok(Box::new(source))
        }
        SourceSelection::Simulate { samples, realtime } => {
            let config = SimulatedSourceConfig {
                samples: *samples,
                speed_mps: simulated_speed(kind),
                realtime_factor: *realtime,
                ..Default::default()
            };
            info!(samples, speed_mps = config.speed_mps, "Running in SIMULATED mode");
            Ok(Box::new(SimulatedLocationSource::new(config)))
        }
    }
}

/// Typical ground speed for the simulator, below every default ceiling
fn simulated_speed(kind: ActivityKind) -> f64 {
    match kind {
        ActivityKind::Walk => 1.4,
        ActivityKind::Run => 3.0,
        ActivityKind::Hike => 1.2,
        ActivityKind::Ride => 6.5,
        ActivityKind::Other => 2.0,
    }
}

fn log_event(event: &TrackerEvent) {
    match event {
        TrackerEvent::StateChanged { from, to } => {
            info!(from = %from, to = %to, "Session state changed");
        }
        TrackerEvent::AcquisitionChanged(status) if status.is_degraded() => {
            warn!(status = ?status, "Location acquisition degraded");
        }
        TrackerEvent::AcquisitionChanged(status) => {
            info!(status = ?status, "Acquisition status changed");
        }
        TrackerEvent::SignalLost {
            session_id,
            silent_for_s,
        } => {
            warn!(session_id = %session_id, silent_for_s, "GPS signal lost");
        }
        TrackerEvent::SignalRestored { session_id } => {
            info!(session_id = %session_id, "GPS signal restored");
        }
    }
}

fn write_summary(path: &Path, summary: &ActivitySummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    std::fs::write(path, json)
        .with_context(|| format!("Failed to write summary to {}", path.display()))?;
    info!(path = %path.display(), "Summary written");
    Ok(())
}
