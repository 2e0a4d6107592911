//! Geospatial accumulator: pure distance / elevation deltas between two samples.

use contracts::PositionSample;

/// Mean Earth radius (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Incremental change produced by one accepted sample
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeoDelta {
    pub distance_m: f64,
    /// Gain only, never negative
    pub elevation_gain_m: f64,
}

/// Great-circle distance between two lat/lng pairs (meters)
pub fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Delta contributed by `candidate`; zero when there is no previous sample.
pub fn accumulate(previous: Option<&PositionSample>, candidate: &PositionSample) -> GeoDelta {
    let Some(previous) = previous else {
        return GeoDelta::default();
    };

    let distance_m = haversine_m(
        previous.latitude,
        previous.longitude,
        candidate.latitude,
        candidate.longitude,
    );

    let elevation_gain_m = match (previous.altitude, candidate.altitude) {
        (Some(from), Some(to)) => (to - from).max(0.0),
        _ => 0.0,
    };

    GeoDelta {
        distance_m,
        elevation_gain_m,
    }
}

/// Implied ground speed between two samples; `None` when time does not advance
pub fn implied_speed(previous: &PositionSample, candidate: &PositionSample) -> Option<f64> {
    let dt = candidate.captured_at - previous.captured_at;
    (dt > 0.0).then(|| {
        haversine_m(
            previous.latitude,
            previous.longitude,
            candidate.latitude,
            candidate.longitude,
        ) / dt
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_degree_longitude_at_equator() {
        let d = haversine_m(0.0, 0.0, 0.0, 1.0);
        let expected = 111_200.0;
        assert!(
            ((d - expected) / expected).abs() < 0.001,
            "distance {d} not within 0.1% of {expected}"
        );
    }

    #[test]
    fn test_zero_distance() {
        assert_eq!(haversine_m(48.85, 2.35, 48.85, 2.35), 0.0);
    }

    #[test]
    fn test_first_sample_contributes_nothing() {
        let sample = PositionSample::new(1.0, 1.0, 5.0, 0.0).with_altitude(100.0);
        assert_eq!(accumulate(None, &sample), GeoDelta::default());
    }

    #[test]
    fn test_descent_does_not_reduce_gain() {
        let a = PositionSample::new(0.0, 0.0, 5.0, 0.0).with_altitude(100.0);
        let b = PositionSample::new(0.0, 0.0, 5.0, 1.0).with_altitude(90.0);
        let c = PositionSample::new(0.0, 0.0, 5.0, 2.0).with_altitude(95.5);

        assert_eq!(accumulate(Some(&a), &b).elevation_gain_m, 0.0);
        assert_eq!(accumulate(Some(&b), &c).elevation_gain_m, 5.5);
    }

    #[test]
    fn test_missing_altitude_gives_zero_gain() {
        let a = PositionSample::new(0.0, 0.0, 5.0, 0.0);
        let b = PositionSample::new(0.0, 0.0, 5.0, 1.0).with_altitude(90.0);
        assert_eq!(accumulate(Some(&a), &b).elevation_gain_m, 0.0);
    }

    #[test]
    fn test_implied_speed_requires_time_progress() {
        let a = PositionSample::new(0.0, 0.0, 5.0, 10.0);
        let b = PositionSample::new(0.0, 0.001, 5.0, 10.0);
        assert!(implied_speed(&a, &b).is_none());

        let c = PositionSample::new(0.0, 0.001, 5.0, 20.0);
        let speed = implied_speed(&a, &c).unwrap();
        assert!((speed - 11.12).abs() < 0.01, "speed = {speed}");
    }
}
