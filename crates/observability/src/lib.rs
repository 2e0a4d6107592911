//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! - Tracing 初始化：默认只放开工作区内各 crate 的日志，第三方依赖保持 `warn`
//! - Prometheus 导出：为定位精度、活动距离与时长注册直方图分桶，并为全部
//!   `tracker_*` / `activity_tracker_*` 指标登记描述
//! - LiveMetrics 指标收集与统计（见 [`metrics`]）
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     metrics_port: Some(9000),
//!     default_log_level: "debug".into(),
//! })?;
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    describe_tracking_metrics, record_activity_completed, record_fix_received,
    record_live_metrics, MetricsSummary, RunningStats, StatsSummary, TrackingMetricsAggregator,
};

/// Targets whose level follows `default_log_level`; everything else stays at `warn`
const TRACKING_TARGETS: &[&str] = &[
    "contracts",
    "config_loader",
    "ingestion",
    "tracking_engine",
    "dispatcher",
    "observability",
    "activity_tracker",
    "simulated_run",
];

/// Fix accuracy (m): sub-meter to well past the default 30 m ceiling
const ACCURACY_BUCKETS: &[f64] = &[1.0, 3.0, 5.0, 10.0, 15.0, 20.0, 30.0, 50.0, 100.0];

/// Finished activity distance (m)
const DISTANCE_BUCKETS: &[f64] = &[
    500.0, 1_000.0, 2_500.0, 5_000.0, 10_000.0, 21_097.5, 42_195.0, 100_000.0,
];

/// Finished activity active duration (s)
const DURATION_BUCKETS: &[f64] = &[300.0, 900.0, 1_800.0, 3_600.0, 7_200.0, 14_400.0];

/// 可观测性配置
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// Prometheus 端口 (None = 禁用)
    pub metrics_port: Option<u16>,
    /// 工作区 crate 的日志级别；`RUST_LOG` 优先
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Compact,
            metrics_port: None,
            default_log_level: "info".to_string(),
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志
    Json,
    /// 人类可读格式
    Pretty,
    /// 紧凑单行格式
    #[default]
    Compact,
}

/// Filter directive: workspace crates at `level`, dependencies at `warn`
pub fn default_filter_directive(level: &str) -> String {
    let mut directive = String::from("warn");
    for target in TRACKING_TARGETS {
        directive.push(',');
        directive.push_str(target);
        directive.push('=');
        directive.push_str(level);
    }
    directive
}

/// 使用自定义配置初始化
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter_directive(&config.default_log_level))
            .with_context(|| format!("Invalid log level '{}'", config.default_log_level))?,
    };

    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );

    Ok(())
}

/// Exporter with the tracking histogram buckets, not yet installed
pub fn tracking_prometheus_builder(port: u16) -> Result<PrometheusBuilder> {
    let builder = PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .set_buckets_for_metric(
            Matcher::Full("activity_tracker_fix_accuracy_m".to_string()),
            ACCURACY_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full("activity_tracker_activity_distance_m".to_string()),
            DISTANCE_BUCKETS,
        )?
        .set_buckets_for_metric(
            Matcher::Full("activity_tracker_activity_duration_s".to_string()),
            DURATION_BUCKETS,
        )?;
    Ok(builder)
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
///
/// 安装 recorder 后登记全部指标描述。
pub fn init_metrics_only(port: u16) -> Result<()> {
    tracking_prometheus_builder(port)?
        .install()
        .context("Failed to install Prometheus recorder")?;
    describe_tracking_metrics();

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
