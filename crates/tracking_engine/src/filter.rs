//! Position sample filter
//!
//! Rules are applied in order: accuracy ceiling, implied-speed plausibility,
//! strictly increasing timestamp. The filter is a pure function of its inputs.

use std::fmt;

use contracts::PositionSample;

use crate::geo::implied_speed;

/// Why a sample was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    LowAccuracy,
    ImplausibleJump,
    OutOfOrder,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::LowAccuracy => "low_accuracy",
            RejectReason::ImplausibleJump => "implausible_jump",
            RejectReason::OutOfOrder => "out_of_order",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filter verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Accepted,
    Rejected(RejectReason),
}

impl FilterDecision {
    #[inline]
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterDecision::Accepted)
    }
}

/// Screens samples before they reach the session
#[derive(Debug, Clone, Copy)]
pub struct PositionFilter {
    accuracy_ceiling_m: f64,
    speed_ceiling_mps: f64,
}

impl PositionFilter {
    pub fn new(accuracy_ceiling_m: f64, speed_ceiling_mps: f64) -> Self {
        Self {
            accuracy_ceiling_m,
            speed_ceiling_mps,
        }
    }

    pub fn speed_ceiling(&self) -> f64 {
        self.speed_ceiling_mps
    }

    pub fn accuracy_ceiling(&self) -> f64 {
        self.accuracy_ceiling_m
    }

    /// Judge `candidate` against the last accepted sample.
    pub fn accept(
        &self,
        candidate: &PositionSample,
        previous: Option<&PositionSample>,
    ) -> FilterDecision {
        if candidate.accuracy > self.accuracy_ceiling_m {
            return FilterDecision::Rejected(RejectReason::LowAccuracy);
        }

        let Some(previous) = previous else {
            return FilterDecision::Accepted;
        };

        if let Some(speed) = implied_speed(previous, candidate) {
            if speed > self.speed_ceiling_mps {
                return FilterDecision::Rejected(RejectReason::ImplausibleJump);
            }
        }

        if candidate.captured_at <= previous.captured_at {
            return FilterDecision::Rejected(RejectReason::OutOfOrder);
        }

        FilterDecision::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> PositionFilter {
        PositionFilter::new(30.0, 12.0)
    }

    #[test]
    fn test_low_accuracy_rejected() {
        let sample = PositionSample::new(0.0, 0.0, 100.0, 1.0);
        assert_eq!(
            filter().accept(&sample, None),
            FilterDecision::Rejected(RejectReason::LowAccuracy)
        );
    }

    #[test]
    fn test_accuracy_at_ceiling_accepted() {
        let sample = PositionSample::new(0.0, 0.0, 30.0, 1.0);
        assert!(filter().accept(&sample, None).is_accepted());
    }

    #[test]
    fn test_first_sample_accepted() {
        let sample = PositionSample::new(10.0, 10.0, 5.0, 1.0);
        assert!(filter().accept(&sample, None).is_accepted());
    }

    #[test]
    fn test_five_km_in_one_second_is_a_jump() {
        let a = PositionSample::new(0.0, 0.0, 5.0, 100.0);
        // ~5 km north
        let b = PositionSample::new(0.045, 0.0, 5.0, 101.0);
        assert_eq!(
            filter().accept(&b, Some(&a)),
            FilterDecision::Rejected(RejectReason::ImplausibleJump)
        );
    }

    #[test]
    fn test_duplicate_timestamp_rejected() {
        let a = PositionSample::new(0.0, 0.0, 5.0, 100.0);
        assert_eq!(
            filter().accept(&a, Some(&a)),
            FilterDecision::Rejected(RejectReason::OutOfOrder)
        );
    }

    #[test]
    fn test_older_timestamp_rejected() {
        let a = PositionSample::new(0.0, 0.0, 5.0, 100.0);
        let b = PositionSample::new(0.0, 0.00001, 5.0, 99.0);
        assert_eq!(
            filter().accept(&b, Some(&a)),
            FilterDecision::Rejected(RejectReason::OutOfOrder)
        );
    }

    #[test]
    fn test_accuracy_checked_before_order() {
        let a = PositionSample::new(0.0, 0.0, 5.0, 100.0);
        let b = PositionSample::new(0.0, 0.0, 50.0, 90.0);
        assert_eq!(
            filter().accept(&b, Some(&a)),
            FilterDecision::Rejected(RejectReason::LowAccuracy)
        );
    }

    #[test]
    fn test_plausible_step_accepted() {
        let a = PositionSample::new(0.0, 0.0, 5.0, 0.0);
        // ~50 m in 10 s
        let b = PositionSample::new(0.0, 0.00045, 5.0, 10.0);
        assert!(filter().accept(&b, Some(&a)).is_accepted());
    }
}
