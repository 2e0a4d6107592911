//! Motion estimator: instantaneous speed from one accepted step.

/// Result of one motion update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionUpdate {
    pub current_speed_mps: f64,
    /// The step spans enough time to feed aggregate statistics (max speed).
    /// Short-interval steps are excluded so a single noisy pair cannot spike the max.
    pub contributes_to_average: bool,
}

/// Stateless speed estimator; the session keeps the running max.
#[derive(Debug, Clone, Copy)]
pub struct MotionEstimator {
    speed_ceiling_mps: f64,
    short_interval_threshold_s: f64,
}

impl MotionEstimator {
    pub fn new(speed_ceiling_mps: f64, short_interval_threshold_s: f64) -> Self {
        Self {
            speed_ceiling_mps,
            short_interval_threshold_s,
        }
    }

    /// Sensor speed wins when present and non-negative, otherwise distance / time.
    pub fn update(
        &self,
        distance_delta_m: f64,
        time_delta_s: f64,
        sensor_speed_mps: Option<f64>,
    ) -> MotionUpdate {
        let raw = match sensor_speed_mps {
            Some(speed) if speed.is_finite() && speed >= 0.0 => speed,
            _ if time_delta_s > 0.0 => distance_delta_m / time_delta_s,
            _ => 0.0,
        };

        MotionUpdate {
            current_speed_mps: raw.clamp(0.0, self.speed_ceiling_mps),
            contributes_to_average: time_delta_s >= self.short_interval_threshold_s,
        }
    }

    /// New max speed after `update`
    pub fn next_max(&self, current_max: f64, update: &MotionUpdate) -> f64 {
        if update.contributes_to_average && update.current_speed_mps > current_max {
            update.current_speed_mps
        } else {
            current_max
        }
    }
}

/// Distance over active duration; zero before any duration has accrued
pub fn average_speed(distance_m: f64, active_duration_s: f64) -> f64 {
    if active_duration_s > 0.0 {
        distance_m / active_duration_s
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> MotionEstimator {
        MotionEstimator::new(12.0, 1.0)
    }

    #[test]
    fn test_prefers_sensor_speed() {
        let update = estimator().update(50.0, 10.0, Some(3.2));
        assert_eq!(update.current_speed_mps, 3.2);
    }

    #[test]
    fn test_negative_sensor_speed_falls_back_to_derived() {
        let update = estimator().update(50.0, 10.0, Some(-1.0));
        assert_eq!(update.current_speed_mps, 5.0);
    }

    #[test]
    fn test_clamped_to_ceiling() {
        let update = estimator().update(500.0, 10.0, None);
        assert_eq!(update.current_speed_mps, 12.0);
    }

    #[test]
    fn test_zero_time_gives_zero_speed() {
        let update = estimator().update(5.0, 0.0, None);
        assert_eq!(update.current_speed_mps, 0.0);
        assert!(!update.contributes_to_average);
    }

    #[test]
    fn test_short_interval_does_not_raise_max() {
        let e = estimator();
        let spike = e.update(9.0, 0.5, None);
        assert_eq!(spike.current_speed_mps, 12.0);
        assert_eq!(e.next_max(3.0, &spike), 3.0);

        let steady = e.update(40.0, 10.0, None);
        assert_eq!(e.next_max(3.0, &steady), 4.0);
        assert_eq!(e.next_max(5.0, &steady), 5.0);
    }

    #[test]
    fn test_average_speed() {
        assert_eq!(average_speed(100.0, 0.0), 0.0);
        assert_eq!(average_speed(150.0, 20.0), 7.5);
    }
}
