//! Signal monitor
//!
//! 用环形缓冲区记录最近 N 次过滤结果（是否被拒绝），结合最近一次定位精度给出信号质量。

use contracts::{SignalConfig, SignalQuality};
use ringbuf::{traits::*, HeapRb};

pub struct SignalMonitor {
    /// true = rejected
    outcomes: HeapRb<bool>,
    last_accuracy_m: Option<f64>,
    accuracy_ceiling_m: f64,
    lost: bool,
    config: SignalConfig,
}

impl std::fmt::Debug for SignalMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalMonitor")
            .field("window", &self.outcomes.occupied_len())
            .field("last_accuracy_m", &self.last_accuracy_m)
            .field("lost", &self.lost)
            .finish()
    }
}

impl SignalMonitor {
    pub fn new(config: &SignalConfig, accuracy_ceiling_m: f64) -> Self {
        Self {
            outcomes: HeapRb::new(config.quality_window.max(1)),
            last_accuracy_m: None,
            accuracy_ceiling_m,
            lost: false,
            config: config.clone(),
        }
    }

    /// Record one filter outcome
    pub fn record(&mut self, rejected: bool, accuracy_m: f64) {
        self.outcomes.push_overwrite(rejected);
        self.last_accuracy_m = Some(accuracy_m);
    }

    /// Share of rejected outcomes in the window
    pub fn rejection_ratio(&self) -> f64 {
        let total = self.outcomes.occupied_len();
        if total == 0 {
            return 0.0;
        }
        let rejected = self.outcomes.iter().filter(|r| **r).count();
        rejected as f64 / total as f64
    }

    pub fn quality(&self) -> SignalQuality {
        if self.lost {
            return SignalQuality::Lost;
        }
        let Some(accuracy) = self.last_accuracy_m else {
            return SignalQuality::Unknown;
        };

        let ratio = self.rejection_ratio();
        let poor_accuracy = self.config.poor_accuracy_fraction * self.accuracy_ceiling_m;
        let fair_accuracy = self.config.fair_accuracy_fraction * self.accuracy_ceiling_m;

        if ratio > self.config.poor_rejection_ratio || accuracy > poor_accuracy {
            SignalQuality::Poor
        } else if ratio > self.config.fair_rejection_ratio || accuracy > fair_accuracy {
            SignalQuality::Fair
        } else {
            SignalQuality::Good
        }
    }

    /// Raise the lost condition; returns false if it was already raised
    pub fn mark_lost(&mut self) -> bool {
        !std::mem::replace(&mut self.lost, true)
    }

    /// Clear the lost condition; returns true if it was raised
    pub fn clear_lost(&mut self) -> bool {
        std::mem::replace(&mut self.lost, false)
    }

    #[inline]
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    pub fn reset(&mut self) {
        self.outcomes.clear();
        self.last_accuracy_m = None;
        self.lost = false;
    }
}
