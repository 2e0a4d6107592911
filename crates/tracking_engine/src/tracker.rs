//! Tracker - synchronous single-writer core
//!
//! Owns the one session of a tracking context and applies lifecycle commands
//! and samples in call order. The async runtime wraps it; tests drive it directly.

use chrono::{DateTime, Utc};
use contracts::{
    AcquisitionStatus, ActivitySummary, GeoBounds, LiveMetrics, PathView, PositionSample,
    ProviderError, SampleCounters, SessionId, SessionState, SignalQuality, TrackerConfig,
};
use tracing::{debug, info, instrument, warn};

use crate::calories::CalorieEstimator;
use crate::error::{Result, TrackerError};
use crate::filter::{FilterDecision, PositionFilter, RejectReason};
use crate::motion::MotionEstimator;
use crate::session::{transition, ActivitySession, Command, Estimators};
use crate::signal::SignalMonitor;

/// What happened to one delivered sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleOutcome {
    /// Appended to the path; `counted` is false while paused
    Accepted { counted: bool },
    Rejected(RejectReason),
    /// No live session
    Ignored,
}

impl SampleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleOutcome::Accepted { .. } => "accepted",
            SampleOutcome::Rejected(reason) => reason.as_str(),
            SampleOutcome::Ignored => "ignored",
        }
    }

    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, SampleOutcome::Accepted { .. })
    }
}

#[derive(Debug)]
pub struct Tracker {
    config: TrackerConfig,
    filter: PositionFilter,
    estimators: Estimators,
    signal: SignalMonitor,
    state: SessionState,
    acquisition: AcquisitionStatus,
    counters: SampleCounters,
    session: Option<ActivitySession>,
}

impl Tracker {
    pub fn new(config: TrackerConfig) -> Self {
        let ceiling = config.speed_ceiling();
        let filter = PositionFilter::new(config.filter.accuracy_ceiling_m, ceiling);
        let estimators = Estimators {
            motion: MotionEstimator::new(ceiling, config.motion.short_interval_threshold_s),
            calories: CalorieEstimator::new(config.body_mass_kg),
        };
        let signal = SignalMonitor::new(&config.signal, filter.accuracy_ceiling());

        Self {
            config,
            filter,
            estimators,
            signal,
            state: SessionState::Idle,
            acquisition: AcquisitionStatus::Idle,
            counters: SampleCounters::default(),
            session: None,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn acquisition(&self) -> AcquisitionStatus {
        self.acquisition
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.as_ref().map(|s| &s.id)
    }

    pub fn signal_quality(&self) -> SignalQuality {
        self.signal.quality()
    }

    #[inline]
    pub fn is_signal_lost(&self) -> bool {
        self.signal.is_lost()
    }

    pub fn counters(&self) -> SampleCounters {
        self.counters
    }

    fn apply(&mut self, command: Command) -> Result<SessionState> {
        let from = self.state;
        match transition(from, command) {
            Ok(next) => {
                self.state = next;
                metrics::counter!("tracker_transitions_total", "command" => command.as_str())
                    .increment(1);
                debug!(command = %command, from = %from, to = %next, "session transition");
                Ok(next)
            }
            Err(err) => {
                metrics::counter!("tracker_illegal_transitions_total", "command" => command.as_str())
                    .increment(1);
                warn!(command = %command, state = %from, "illegal session transition ignored");
                Err(err)
            }
        }
    }

    /// Begin a new session; legal only from idle.
    pub fn start(&mut self, started_at: DateTime<Utc>) -> Result<SessionId> {
        self.apply(Command::Start)?;

        let id = SessionId::generate(started_at);
        self.session = Some(ActivitySession::new(
            id.clone(),
            self.config.activity_kind,
            started_at,
        ));
        self.counters = SampleCounters::default();
        self.signal.reset();
        self.acquisition = AcquisitionStatus::Acquiring;

        info!(session_id = %id, kind = %self.config.activity_kind, "session started");
        Ok(id)
    }

    pub fn pause(&mut self) -> Result<()> {
        self.apply(Command::Pause)?;
        if let Some(session) = self.session.as_mut() {
            session.suspend();
        }
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        self.apply(Command::Resume)?;
        Ok(())
    }

    /// Complete the session and freeze its totals
    pub fn stop(&mut self) -> Result<ActivitySummary> {
        self.apply(Command::Stop)?;
        let summary = self
            .session
            .as_mut()
            .map(|session| {
                session.suspend();
                session.summary()
            })
            .ok_or(TrackerError::NoSession)?;

        self.signal.clear_lost();
        self.acquisition = AcquisitionStatus::Idle;

        info!(
            session_id = %summary.session_id,
            distance_m = summary.distance_m,
            duration_s = summary.duration_s,
            points = summary.path.len(),
            "session completed"
        );
        Ok(summary)
    }

    /// Discard the session; nothing is ever produced for it
    pub fn cancel(&mut self) -> Result<()> {
        self.apply(Command::Cancel)?;
        if let Some(session) = self.session.take() {
            info!(session_id = %session.id, "session cancelled");
        }
        self.counters = SampleCounters::default();
        self.signal.reset();
        self.acquisition = AcquisitionStatus::Idle;
        Ok(())
    }

    /// Terminal back to idle so the context can start again
    pub fn reset(&mut self) -> Result<()> {
        self.apply(Command::Reset)?;
        self.session = None;
        self.counters = SampleCounters::default();
        self.signal.reset();
        self.acquisition = AcquisitionStatus::Idle;
        Ok(())
    }

    /// Process one sample. Never fails; the outcome says what happened.
    #[instrument(
        name = "tracker_on_sample",
        level = "trace",
        skip_all,
        fields(captured_at = sample.captured_at)
    )]
    pub fn on_sample(&mut self, sample: PositionSample) -> SampleOutcome {
        let live = self.state.is_live();
        let Some(session) = self.session.as_mut().filter(|_| live) else {
            self.counters.ignored += 1;
            metrics::counter!("tracker_samples_total", "outcome" => "ignored").increment(1);
            return SampleOutcome::Ignored;
        };

        self.acquisition = AcquisitionStatus::Tracking;

        match self.filter.accept(&sample, session.last_accepted.as_ref()) {
            FilterDecision::Rejected(reason) => {
                match reason {
                    RejectReason::LowAccuracy => self.counters.rejected_low_accuracy += 1,
                    RejectReason::ImplausibleJump => self.counters.rejected_implausible_jump += 1,
                    RejectReason::OutOfOrder => self.counters.rejected_out_of_order += 1,
                }
                self.signal.record(true, sample.accuracy);
                metrics::counter!("tracker_samples_total", "outcome" => reason.as_str())
                    .increment(1);
                debug!(
                    session_id = %session.id,
                    reason = %reason,
                    accuracy = sample.accuracy,
                    "sample rejected"
                );
                SampleOutcome::Rejected(reason)
            }
            FilterDecision::Accepted => {
                let counted = self.state == SessionState::Active;
                if counted {
                    session.apply_sample(sample, &self.estimators);
                } else {
                    session.append_paused(sample);
                }

                self.counters.accepted += 1;
                self.signal.record(false, sample.accuracy);
                if self.signal.clear_lost() {
                    info!(session_id = %session.id, "signal restored");
                }
                metrics::counter!("tracker_samples_total", "outcome" => "accepted").increment(1);
                SampleOutcome::Accepted { counted }
            }
        }
    }

    /// Provider error: acquisition degrades, the session state never changes
    pub fn on_provider_error(&mut self, error: ProviderError) -> AcquisitionStatus {
        self.acquisition = error.acquisition_status();
        metrics::counter!("tracker_provider_errors_total", "error" => error.as_str()).increment(1);
        warn!(
            error = %error,
            state = %self.state,
            "location provider error, acquisition degraded"
        );
        self.acquisition
    }

    /// Raise "signal lost" while active. Returns true when newly raised.
    pub fn mark_signal_lost(&mut self) -> bool {
        if self.state != SessionState::Active || !self.signal.mark_lost() {
            return false;
        }
        metrics::counter!("tracker_signal_lost_total").increment(1);
        if let Some(id) = self.session_id() {
            warn!(session_id = %id, "signal lost");
        }
        true
    }

    /// Read-only path snapshot (empty without a session)
    pub fn path(&self) -> PathView {
        self.session
            .as_ref()
            .map(|s| s.path.snapshot())
            .unwrap_or_default()
    }

    pub fn last_accepted(&self) -> Option<&PositionSample> {
        self.session.as_ref().and_then(|s| s.last_accepted.as_ref())
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        self.session.as_ref().and_then(|s| s.path.bounds())
    }

    /// Live snapshot; `elapsed_wall_s` is left to the display ticker
    pub fn metrics(&self) -> LiveMetrics {
        let mut metrics = LiveMetrics {
            session_id: self.session_id().cloned(),
            state: self.state,
            activity_kind: self.config.activity_kind,
            signal_quality: self.signal.quality(),
            signal_lost: self.signal.is_lost(),
            acquisition: self.acquisition,
            counters: self.counters,
            ..Default::default()
        };

        if let Some(session) = &self.session {
            metrics.current_speed_mps = session.current_speed_mps;
            metrics.average_speed_mps = session.average_speed_mps;
            metrics.max_speed_mps = session.max_speed_mps;
            metrics.distance_m = session.distance_m;
            metrics.elevation_gain_m = session.elevation_gain_m;
            metrics.calories_kcal = session.calories_kcal;
            metrics.active_duration_s = session.active_duration_s;
            metrics.path_len = session.path.len();
        }
        metrics
    }
}
