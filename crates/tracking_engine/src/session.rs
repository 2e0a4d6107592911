//! Activity session state machine
//!
//! `transition` is the pure lifecycle function; [`ActivitySession`] holds the
//! totals and is only mutated through [`ActivitySession::apply_sample`].
//!
//! ```text
//! Idle --start--> Active --pause--> Paused --resume--> Active
//! Active | Paused --stop--> Completed
//! Idle | Active | Paused --cancel--> Cancelled
//! Completed | Cancelled --reset--> Idle
//! ```

use chrono::{DateTime, Utc};
use contracts::{ActivityKind, ActivitySummary, PositionSample, SessionId, SessionState};
use std::fmt;

use crate::calories::CalorieEstimator;
use crate::error::{Result, TrackerError};
use crate::geo;
use crate::motion::{average_speed, MotionEstimator};
use crate::path::PathBuffer;

/// Lifecycle command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
    Cancel,
    Reset,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Stop => "stop",
            Command::Cancel => "cancel",
            Command::Reset => "reset",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Next state for `command`, or an illegal-transition error leaving `state` as is.
pub fn transition(state: SessionState, command: Command) -> Result<SessionState> {
    use SessionState::*;

    let next = match (command, state) {
        (Command::Start, Idle) => Active,
        (Command::Pause, Active) => Paused,
        (Command::Resume, Paused) => Active,
        (Command::Stop, Active | Paused) => Completed,
        (Command::Cancel, Idle | Active | Paused) => Cancelled,
        (Command::Reset, Completed | Cancelled) => Idle,
        _ => {
            return Err(TrackerError::IllegalTransition {
                operation: command.as_str(),
                from: state,
            })
        }
    };
    Ok(next)
}

/// Estimators a session accumulates with
#[derive(Debug, Clone, Copy)]
pub struct Estimators {
    pub motion: MotionEstimator,
    pub calories: CalorieEstimator,
}

/// Aggregate root for one tracked activity
#[derive(Debug)]
pub struct ActivitySession {
    pub id: SessionId,
    pub activity_kind: ActivityKind,
    pub started_at: DateTime<Utc>,
    pub path: PathBuffer,
    pub active_duration_s: f64,
    pub distance_m: f64,
    pub current_speed_mps: f64,
    pub average_speed_mps: f64,
    pub max_speed_mps: f64,
    pub elevation_gain_m: f64,
    pub calories_kcal: f64,
    pub last_accepted: Option<PositionSample>,
    /// false until the first accepted sample after start/resume; duration and
    /// calories only accrue between samples of the same active segment
    segment_open: bool,
}

impl ActivitySession {
    pub fn new(id: SessionId, activity_kind: ActivityKind, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            activity_kind,
            started_at,
            path: PathBuffer::new(),
            active_duration_s: 0.0,
            distance_m: 0.0,
            current_speed_mps: 0.0,
            average_speed_mps: 0.0,
            max_speed_mps: 0.0,
            elevation_gain_m: 0.0,
            calories_kcal: 0.0,
            last_accepted: None,
            segment_open: false,
        }
    }

    /// Accepted sample while active: append and accumulate.
    pub fn apply_sample(&mut self, sample: PositionSample, estimators: &Estimators) {
        let previous = self.last_accepted;
        let delta = geo::accumulate(previous.as_ref(), &sample);

        let step_s = previous
            .map(|p| (sample.captured_at - p.captured_at).max(0.0))
            .unwrap_or(0.0);
        let active_s = if self.segment_open { step_s } else { 0.0 };
        self.segment_open = true;

        let motion = estimators.motion.update(delta.distance_m, step_s, sample.speed);

        self.distance_m += delta.distance_m;
        self.elevation_gain_m += delta.elevation_gain_m;
        self.active_duration_s += active_s;
        self.current_speed_mps = motion.current_speed_mps;
        self.max_speed_mps = estimators.motion.next_max(self.max_speed_mps, &motion);
        self.average_speed_mps = average_speed(self.distance_m, self.active_duration_s);
        self.calories_kcal += estimators.calories.estimate(
            active_s,
            motion.current_speed_mps,
            self.activity_kind,
        );

        self.path.push(sample);
        self.last_accepted = Some(sample);
    }

    /// Accepted sample while paused: trace continuity only, no totals.
    pub fn append_paused(&mut self, sample: PositionSample) {
        self.path.push(sample);
        self.last_accepted = Some(sample);
    }

    /// Close the current active segment
    pub fn suspend(&mut self) {
        self.current_speed_mps = 0.0;
        self.segment_open = false;
    }

    pub fn summary(&self) -> ActivitySummary {
        ActivitySummary {
            session_id: self.id.clone(),
            activity_kind: self.activity_kind,
            started_at: self.started_at,
            duration_s: self.active_duration_s,
            distance_m: self.distance_m,
            average_speed_mps: self.average_speed_mps,
            max_speed_mps: self.max_speed_mps,
            elevation_gain_m: self.elevation_gain_m,
            calories_kcal: self.calories_kcal,
            path: self.path.snapshot().to_vec(),
        }
    }
}
