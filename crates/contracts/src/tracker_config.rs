//! Tracking engine configuration contracts that can be shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ActivityKind;

/// Position sample filter thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FilterConfig {
    /// Fixes with a larger accuracy radius are rejected (meters)
    #[serde(default = "default_accuracy_ceiling")]
    #[validate(range(min = 1.0, max = 10000.0))]
    pub accuracy_ceiling_m: f64,

    /// Implied-speed plausibility ceiling per activity kind
    #[serde(default)]
    #[validate(nested)]
    pub speed_ceilings: SpeedCeilings,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            accuracy_ceiling_m: default_accuracy_ceiling(),
            speed_ceilings: SpeedCeilings::default(),
        }
    }
}

fn default_accuracy_ceiling() -> f64 {
    30.0
}

/// Plausibility ceiling (m/s) for each activity kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SpeedCeilings {
    #[validate(range(min = 0.1, max = 200.0))]
    pub walk: f64,
    #[validate(range(min = 0.1, max = 200.0))]
    pub run: f64,
    #[validate(range(min = 0.1, max = 200.0))]
    pub hike: f64,
    #[validate(range(min = 0.1, max = 200.0))]
    pub ride: f64,
    #[validate(range(min = 0.1, max = 200.0))]
    pub other: f64,
}

impl SpeedCeilings {
    pub fn for_kind(&self, kind: ActivityKind) -> f64 {
        match kind {
            ActivityKind::Walk => self.walk,
            ActivityKind::Run => self.run,
            ActivityKind::Hike => self.hike,
            ActivityKind::Ride => self.ride,
            ActivityKind::Other => self.other,
        }
    }
}

impl Default for SpeedCeilings {
    fn default() -> Self {
        Self {
            walk: 4.0,
            run: 12.0,
            hike: 6.0,
            ride: 25.0,
            other: 12.0,
        }
    }
}

/// Motion estimator tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MotionConfig {
    /// Samples closer together than this never update the max speed (seconds)
    #[serde(default = "default_short_interval")]
    #[validate(range(min = 0.0, max = 60.0))]
    pub short_interval_threshold_s: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            short_interval_threshold_s: default_short_interval(),
        }
    }
}

fn default_short_interval() -> f64 {
    1.0
}

/// Signal monitor thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SignalConfig {
    /// Raise "signal lost" after this long without an accepted sample (seconds)
    #[validate(range(min = 1.0, max = 3600.0))]
    pub lost_after_s: f64,

    /// Number of recent filter outcomes used for the rejection ratio
    #[validate(range(min = 1, max = 10000))]
    pub quality_window: usize,

    /// Rejection ratio above which quality is at best Fair
    #[validate(range(min = 0.0, max = 1.0))]
    pub fair_rejection_ratio: f64,

    /// Rejection ratio above which quality is Poor
    #[validate(range(min = 0.0, max = 1.0))]
    pub poor_rejection_ratio: f64,

    /// Accuracy above this fraction of the ceiling is at best Fair
    #[validate(range(min = 0.0, max = 1.0))]
    pub fair_accuracy_fraction: f64,

    /// Accuracy above this fraction of the ceiling is Poor
    #[validate(range(min = 0.0, max = 1.0))]
    pub poor_accuracy_fraction: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            lost_after_s: 15.0,
            quality_window: 20,
            fair_rejection_ratio: 0.2,
            poor_rejection_ratio: 0.5,
            fair_accuracy_fraction: 1.0 / 3.0,
            poor_accuracy_fraction: 2.0 / 3.0,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    pub activity_kind: ActivityKind,
    pub body_mass_kg: f64,
    /// Wall-clock display refresh period (milliseconds)
    pub display_tick_ms: u64,
    pub filter: FilterConfig,
    pub motion: MotionConfig,
    pub signal: SignalConfig,
}

impl TrackerConfig {
    /// Plausibility ceiling for the configured activity kind
    pub fn speed_ceiling(&self) -> f64 {
        self.filter.speed_ceilings.for_kind(self.activity_kind)
    }

    pub fn with_kind(mut self, kind: ActivityKind) -> Self {
        self.activity_kind = kind;
        self
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            activity_kind: ActivityKind::Run,
            body_mass_kg: 70.0,
            display_tick_ms: 1000,
            filter: FilterConfig::default(),
            motion: MotionConfig::default(),
            signal: SignalConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.filter.accuracy_ceiling_m, 30.0);
        assert_eq!(config.speed_ceiling(), 12.0);
        assert_eq!(config.signal.lost_after_s, 15.0);
        assert_eq!(config.motion.short_interval_threshold_s, 1.0);
    }

    #[test]
    fn test_ceiling_per_kind() {
        let config = TrackerConfig::default().with_kind(ActivityKind::Ride);
        assert_eq!(config.speed_ceiling(), 25.0);
        assert_eq!(config.filter.speed_ceilings.for_kind(ActivityKind::Walk), 4.0);
    }

    #[test]
    fn test_range_validation() {
        let mut filter = FilterConfig::default();
        assert!(filter.validate().is_ok());

        filter.accuracy_ceiling_m = 0.0;
        assert!(filter.validate().is_err());
    }
}
