//! Calorie estimator
//!
//! MET (metabolic equivalent) lookup by activity kind and speed band:
//! `kcal = MET × body mass (kg) × hours`. Pure and non-negative.

use contracts::ActivityKind;

/// Below this speed the user is considered standing still (m/s)
const STANDING_SPEED_MPS: f64 = 0.2;

/// MET while standing
const STANDING_MET: f64 = 1.3;

// (upper speed bound m/s, MET); last band is open-ended
const WALK_BANDS: &[(f64, f64)] = &[(0.9, 2.0), (1.34, 3.0), (1.79, 4.3), (f64::INFINITY, 5.0)];

const RUN_BANDS: &[(f64, f64)] = &[
    (1.8, 6.0),
    (2.2, 8.3),
    (2.7, 9.8),
    (3.1, 11.0),
    (3.6, 11.8),
    (4.5, 12.8),
    (f64::INFINITY, 14.5),
];

const HIKE_BANDS: &[(f64, f64)] = &[(0.8, 3.5), (1.5, 6.0), (f64::INFINITY, 7.8)];

const RIDE_BANDS: &[(f64, f64)] = &[
    (4.47, 4.0),
    (5.36, 6.8),
    (6.26, 8.0),
    (7.15, 10.0),
    (8.94, 12.0),
    (f64::INFINITY, 15.8),
];

const OTHER_BANDS: &[(f64, f64)] = &[(1.0, 2.5), (2.0, 4.0), (f64::INFINITY, 6.0)];

#[derive(Debug, Clone, Copy)]
pub struct CalorieEstimator {
    body_mass_kg: f64,
}

impl CalorieEstimator {
    pub fn new(body_mass_kg: f64) -> Self {
        Self { body_mass_kg }
    }

    /// MET for a kind at the given speed
    pub fn met(kind: ActivityKind, speed_mps: f64) -> f64 {
        if !speed_mps.is_finite() || speed_mps < STANDING_SPEED_MPS {
            return STANDING_MET;
        }

        let bands = match kind {
            ActivityKind::Walk => WALK_BANDS,
            ActivityKind::Run => RUN_BANDS,
            ActivityKind::Hike => HIKE_BANDS,
            ActivityKind::Ride => RIDE_BANDS,
            ActivityKind::Other => OTHER_BANDS,
        };

        bands
            .iter()
            .find(|(upper, _)| speed_mps < *upper)
            .map(|(_, met)| *met)
            .unwrap_or(STANDING_MET)
    }

    /// Calories burnt over `active_delta_s` at `speed_mps`
    pub fn estimate(&self, active_delta_s: f64, speed_mps: f64, kind: ActivityKind) -> f64 {
        if !active_delta_s.is_finite() || active_delta_s <= 0.0 {
            return 0.0;
        }
        let kcal = Self::met(kind, speed_mps) * self.body_mass_kg * active_delta_s / 3600.0;
        kcal.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_hour_easy_run() {
        // 10 km/h ≈ 2.78 m/s → 11.0 MET
        let estimator = CalorieEstimator::new(70.0);
        let kcal = estimator.estimate(3600.0, 2.78, ActivityKind::Run);
        assert!((kcal - 770.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_positive_duration_is_zero() {
        let estimator = CalorieEstimator::new(70.0);
        assert_eq!(estimator.estimate(0.0, 3.0, ActivityKind::Run), 0.0);
        assert_eq!(estimator.estimate(-5.0, 3.0, ActivityKind::Run), 0.0);
        assert_eq!(estimator.estimate(f64::NAN, 3.0, ActivityKind::Run), 0.0);
    }

    #[test]
    fn test_standing_met() {
        for kind in ActivityKind::ALL {
            assert_eq!(CalorieEstimator::met(kind, 0.0), STANDING_MET);
        }
    }

    #[test]
    fn test_met_non_decreasing_with_speed() {
        for kind in ActivityKind::ALL {
            let mut last = 0.0;
            for step in 0..200 {
                let met = CalorieEstimator::met(kind, step as f64 * 0.1);
                assert!(met >= last, "{kind} MET decreased at {step}");
                last = met;
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let estimator = CalorieEstimator::new(82.5);
        let a = estimator.estimate(12.0, 6.1, ActivityKind::Ride);
        let b = estimator.estimate(12.0, 6.1, ActivityKind::Ride);
        assert_eq!(a, b);
        assert!(a > 0.0);
    }
}
