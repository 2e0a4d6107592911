//! Tracking 指标收集模块
//!
//! 基于 LiveMetrics / ActivitySummary 记录追踪引擎的运行指标，
//! 并在内存中聚合，供 CLI 结束时输出报告。

use contracts::{ActivitySummary, LiveMetrics, SampleCounters, SessionState};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use std::collections::BTreeMap;

/// 登记全部追踪指标的描述（在 recorder 安装之后调用）
pub fn describe_tracking_metrics() {
    // engine
    describe_counter!(
        "tracker_samples_total",
        Unit::Count,
        "Samples seen by the tracker, by outcome (accepted / ignored / reject reason)"
    );
    describe_counter!(
        "tracker_transitions_total",
        Unit::Count,
        "Session lifecycle transitions applied"
    );
    describe_counter!(
        "tracker_illegal_transitions_total",
        Unit::Count,
        "Lifecycle commands refused in the current state"
    );
    describe_counter!(
        "tracker_provider_errors_total",
        Unit::Count,
        "Location provider errors reported to the tracker"
    );
    describe_counter!(
        "tracker_signal_lost_total",
        Unit::Count,
        "Signal lost conditions raised while active"
    );
    describe_counter!(
        "tracker_render_updates_dropped_total",
        Unit::Count,
        "Track updates dropped because the render queue was full"
    );
    describe_counter!(
        "tracker_summaries_dropped_total",
        Unit::Count,
        "Activity summaries that could not be handed to persistence"
    );

    // ingestion / renderers / persistence
    describe_counter!(
        "ingestion_updates_dropped_total",
        Unit::Count,
        "Location updates dropped by ingestion backpressure"
    );
    describe_counter!(
        "ingestion_invalid_fixes_total",
        Unit::Count,
        "Raw fixes rejected by normalization"
    );
    describe_counter!(
        "renderer_updates_dropped_total",
        Unit::Count,
        "Track updates dropped by a full renderer queue"
    );
    describe_counter!(
        "renderer_failures_total",
        Unit::Count,
        "Failed renderer calls, by renderer and operation"
    );
    describe_counter!(
        "persistence_summaries_saved_total",
        Unit::Count,
        "Activity summaries saved by the store"
    );
    describe_counter!(
        "persistence_failures_total",
        Unit::Count,
        "Activity summaries the store failed to save"
    );

    // live snapshot
    describe_gauge!("activity_tracker_distance_m", "Distance of the live session (m)");
    describe_gauge!(
        "activity_tracker_current_speed_mps",
        "Speed of the most recent accepted sample (m/s)"
    );
    describe_gauge!(
        "activity_tracker_average_speed_mps",
        "Distance over active duration (m/s)"
    );
    describe_gauge!(
        "activity_tracker_elevation_gain_m",
        "Accumulated elevation gain (m)"
    );
    describe_gauge!("activity_tracker_calories_kcal", "Calorie estimate (kcal)");
    describe_gauge!(
        "activity_tracker_active_duration_s",
        Unit::Seconds,
        "Active duration, paused intervals excluded"
    );
    describe_gauge!("activity_tracker_path_len", Unit::Count, "Points in the session path");
    describe_gauge!(
        "activity_tracker_signal_lost",
        "1 while the signal lost condition is raised"
    );

    describe_counter!(
        "activity_tracker_fixes_received_total",
        Unit::Count,
        "Raw fixes delivered by the location source"
    );
    describe_histogram!(
        "activity_tracker_fix_accuracy_m",
        "Reported accuracy of raw fixes (m)"
    );
    describe_counter!(
        "activity_tracker_activities_completed_total",
        Unit::Count,
        "Completed activities, by kind"
    );
    describe_histogram!(
        "activity_tracker_activity_distance_m",
        "Distance of completed activities (m)"
    );
    describe_histogram!(
        "activity_tracker_activity_duration_s",
        Unit::Seconds,
        "Active duration of completed activities"
    );
}

/// 从 LiveMetrics 记录 gauge 指标
///
/// 每次 live snapshot 变化时调用。
pub fn record_live_metrics(metrics: &LiveMetrics) {
    gauge!("activity_tracker_distance_m").set(metrics.distance_m);
    gauge!("activity_tracker_current_speed_mps").set(metrics.current_speed_mps);
    gauge!("activity_tracker_average_speed_mps").set(metrics.average_speed_mps);
    gauge!("activity_tracker_elevation_gain_m").set(metrics.elevation_gain_m);
    gauge!("activity_tracker_calories_kcal").set(metrics.calories_kcal);
    gauge!("activity_tracker_active_duration_s").set(metrics.active_duration_s);
    gauge!("activity_tracker_path_len").set(metrics.path_len as f64);
    gauge!("activity_tracker_signal_lost").set(if metrics.signal_lost { 1.0 } else { 0.0 });
}

/// 记录原始定位（进入引擎之前）
pub fn record_fix_received(source: &str, accuracy_m: f64) {
    counter!(
        "activity_tracker_fixes_received_total",
        "source" => source.to_string()
    )
    .increment(1);
    histogram!("activity_tracker_fix_accuracy_m").record(accuracy_m);
}

/// 记录完成的活动
pub fn record_activity_completed(summary: &ActivitySummary) {
    counter!(
        "activity_tracker_activities_completed_total",
        "kind" => summary.activity_kind.as_str()
    )
    .increment(1);
    histogram!("activity_tracker_activity_distance_m").record(summary.distance_m);
    histogram!("activity_tracker_activity_duration_s").record(summary.duration_s);
}

/// 追踪指标聚合器
///
/// 在内存中聚合指标，便于统计和输出摘要。
#[derive(Debug, Clone, Default)]
pub struct TrackingMetricsAggregator {
    /// 收到的原始定位数
    pub fixes_received: u64,

    /// 定位精度统计 (米)
    pub accuracy_stats: RunningStats,

    /// 速度统计 (m/s)，每个新接受的样本记录一次
    pub speed_stats: RunningStats,

    /// 信号丢失次数
    pub signal_lost_events: u64,

    /// 过滤结果计数
    pub counters: SampleCounters,

    last_path_len: usize,
    last_signal_lost: bool,
}

impl TrackingMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 原始定位
    pub fn record_fix(&mut self, accuracy_m: f64) {
        self.fixes_received += 1;
        self.accuracy_stats.push(accuracy_m);
    }

    /// 更新 live snapshot
    pub fn update(&mut self, metrics: &LiveMetrics) {
        if metrics.path_len > self.last_path_len && metrics.state == SessionState::Active {
            self.speed_stats.push(metrics.current_speed_mps);
        }
        self.last_path_len = metrics.path_len;

        if metrics.signal_lost && !self.last_signal_lost {
            self.signal_lost_events += 1;
        }
        self.last_signal_lost = metrics.signal_lost;

        // counters reset with the session; keep the last non-empty view
        if metrics.session_id.is_some() {
            self.counters = metrics.counters;
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let seen = self.counters.accepted + self.counters.rejected();
        let mut rejections = BTreeMap::new();
        rejections.insert("low_accuracy", self.counters.rejected_low_accuracy);
        rejections.insert("implausible_jump", self.counters.rejected_implausible_jump);
        rejections.insert("out_of_order", self.counters.rejected_out_of_order);

        MetricsSummary {
            fixes_received: self.fixes_received,
            accepted: self.counters.accepted,
            rejected: self.counters.rejected(),
            ignored: self.counters.ignored,
            rejection_rate: if seen > 0 {
                self.counters.rejected() as f64 / seen as f64 * 100.0
            } else {
                0.0
            },
            signal_lost_events: self.signal_lost_events,
            accuracy_m: StatsSummary::from(&self.accuracy_stats),
            speed_mps: StatsSummary::from(&self.speed_stats),
            rejections,
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub fixes_received: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub ignored: u64,
    pub rejection_rate: f64,
    pub signal_lost_events: u64,
    pub accuracy_m: StatsSummary,
    pub speed_mps: StatsSummary,
    pub rejections: BTreeMap<&'static str, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Tracking Metrics Summary ===")?;
        writeln!(f, "Fixes received: {}", self.fixes_received)?;
        writeln!(f, "Accepted samples: {}", self.accepted)?;
        writeln!(
            f,
            "Rejected samples: {} ({:.2}%)",
            self.rejected, self.rejection_rate
        )?;
        writeln!(f, "Ignored samples: {}", self.ignored)?;
        writeln!(f, "Signal lost events: {}", self.signal_lost_events)?;
        writeln!(f, "Fix accuracy (m): {}", self.accuracy_m)?;
        writeln!(f, "Speed (m/s): {}", self.speed_mps)?;

        if self.rejected > 0 {
            writeln!(f, "Rejections by reason:")?;
            for (reason, count) in self.rejections.iter().filter(|(_, c)| **c > 0) {
                writeln!(f, "  {}: {}", reason, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.2}, max={:.2}, mean={:.2}, std={:.2} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
