//! Session-level model: lifecycle state, live snapshot and the finished summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ContractError, PositionSample, SessionId};

/// Kind of physical activity being tracked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Walk,
    #[default]
    Run,
    Hike,
    Ride,
    Other,
}

impl ActivityKind {
    /// All kinds, in declaration order
    pub const ALL: [ActivityKind; 5] = [
        ActivityKind::Walk,
        ActivityKind::Run,
        ActivityKind::Hike,
        ActivityKind::Ride,
        ActivityKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityKind::Walk => "walk",
            ActivityKind::Run => "run",
            ActivityKind::Hike => "hike",
            ActivityKind::Ride => "ride",
            ActivityKind::Other => "other",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityKind {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "walk" => Ok(ActivityKind::Walk),
            "run" => Ok(ActivityKind::Run),
            "hike" => Ok(ActivityKind::Hike),
            "ride" | "bike" | "cycle" => Ok(ActivityKind::Ride),
            "other" => Ok(ActivityKind::Other),
            other => Err(ContractError::Other(format!("unknown activity kind '{other}'"))),
        }
    }
}

/// Session lifecycle state
///
/// `Idle -> Active <-> Paused -> Completed | Cancelled`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl SessionState {
    /// Completed or cancelled
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Cancelled)
    }

    /// A session exists and still accepts samples (active or paused)
    #[inline]
    pub fn is_live(&self) -> bool {
        matches!(self, SessionState::Active | SessionState::Paused)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Active => "active",
            SessionState::Paused => "paused",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic indicator of fix quality
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalQuality {
    /// No sample seen yet
    #[default]
    Unknown,
    Good,
    Fair,
    Poor,
    /// No sample accepted within the configured interval while active
    Lost,
}

/// Location acquisition status, independent of session state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionStatus {
    #[default]
    Idle,
    Acquiring,
    Tracking,
    PermissionDenied,
    PositionUnavailable,
    TimedOut,
}

impl AcquisitionStatus {
    /// Acquisition stopped because of a provider error
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            AcquisitionStatus::PermissionDenied
                | AcquisitionStatus::PositionUnavailable
                | AcquisitionStatus::TimedOut
        )
    }
}

/// Filter outcome counters (diagnostics only)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleCounters {
    pub accepted: u64,
    pub rejected_low_accuracy: u64,
    pub rejected_implausible_jump: u64,
    pub rejected_out_of_order: u64,
    /// Samples received with no live session
    pub ignored: u64,
}

impl SampleCounters {
    pub fn rejected(&self) -> u64 {
        self.rejected_low_accuracy + self.rejected_implausible_jump + self.rejected_out_of_order
    }
}

/// Live metrics snapshot (continuous, for UI/dashboards)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveMetrics {
    #[serde(default)]
    pub session_id: Option<SessionId>,
    pub state: SessionState,
    pub activity_kind: ActivityKind,
    pub current_speed_mps: f64,
    pub average_speed_mps: f64,
    pub max_speed_mps: f64,
    pub distance_m: f64,
    pub elevation_gain_m: f64,
    pub calories_kcal: f64,
    pub active_duration_s: f64,
    pub signal_quality: SignalQuality,
    pub signal_lost: bool,
    pub acquisition: AcquisitionStatus,
    pub path_len: usize,
    pub counters: SampleCounters,
    /// Wall-clock time since start, refreshed by the display ticker only
    pub elapsed_wall_s: f64,
}

/// Finished activity, handed to the persistence collaborator on completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub session_id: SessionId,
    pub activity_kind: ActivityKind,
    pub started_at: DateTime<Utc>,
    /// Active duration (paused intervals excluded)
    pub duration_s: f64,
    pub distance_m: f64,
    pub average_speed_mps: f64,
    pub max_speed_mps: f64,
    pub elevation_gain_m: f64,
    pub calories_kcal: f64,
    pub path: Vec<PositionSample>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_classification() {
        assert!(SessionState::Active.is_live());
        assert!(SessionState::Paused.is_live());
        assert!(!SessionState::Idle.is_live());
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert!(!SessionState::Paused.is_terminal());
    }

    #[test]
    fn test_activity_kind_parse() {
        assert_eq!("RUN".parse::<ActivityKind>().unwrap(), ActivityKind::Run);
        assert_eq!("bike".parse::<ActivityKind>().unwrap(), ActivityKind::Ride);
        assert!("swim".parse::<ActivityKind>().is_err());
    }

    #[test]
    fn test_activity_kind_serde() {
        let json = serde_json::to_string(&ActivityKind::Hike).unwrap();
        assert_eq!(json, "\"hike\"");
    }

    #[test]
    fn test_counters_rejected_sum() {
        let counters = SampleCounters {
            accepted: 3,
            rejected_low_accuracy: 1,
            rejected_implausible_jump: 2,
            rejected_out_of_order: 4,
            ignored: 9,
        };
        assert_eq!(counters.rejected(), 7);
    }
}
