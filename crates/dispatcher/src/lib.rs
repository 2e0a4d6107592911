//! # Dispatcher
//!
//! 同步适配层（Sync Adapter）。
//!
//! 负责：
//! - 消费 `TrackUpdate`，fan-out 到多个地图渲染器
//! - 每个渲染器独立队列 + worker，慢渲染器不阻塞采集主链路
//! - 将完成的 `ActivitySummary` 交给持久化协作者

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod persistence;
pub mod renderers;
pub mod stores;

pub use contracts::{MapRenderer, TrackUpdate};
pub use dispatcher::{create_dispatcher, DispatcherBuilder, DispatcherConfig, RendererDispatcher};
pub use error::DispatcherError;
pub use handle::RendererHandle;
pub use metrics::{MetricsSnapshot, WorkerMetrics};
pub use persistence::{create_summary_writer, SummaryWriter};
pub use renderers::{GeoJsonRenderer, LogRenderer, NetworkFormat, NetworkRenderer};
pub use stores::{JsonFileStore, LogStore};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{TimeZone, Utc};
    use contracts::{
        ActivityKind, ActivitySummary, GeoBounds, LiveMetrics, PathView, PositionSample,
        TrackUpdate,
    };

    fn samples(points: usize) -> Vec<PositionSample> {
        (0..points)
            .map(|i| PositionSample::new(52.5, 13.35 + i as f64 * 1e-4, 5.0, i as f64 * 5.0))
            .collect()
    }

    /// Update whose path has `points` samples heading east
    pub fn track_update(session: &str, points: usize) -> TrackUpdate {
        let samples = samples(points.max(1));
        let path = PathView::from_parts(Vec::new(), &samples);
        let last = samples[samples.len() - 1].point();
        let bounds = path.bounds().unwrap_or_else(|| GeoBounds::around(last));

        TrackUpdate {
            session_id: session.into(),
            position: last,
            path,
            bounds,
            metrics: LiveMetrics {
                path_len: samples.len(),
                ..Default::default()
            },
        }
    }

    pub fn summary(session: &str, points: usize) -> ActivitySummary {
        ActivitySummary {
            session_id: session.into(),
            activity_kind: ActivityKind::Run,
            started_at: Utc.with_ymd_and_hms(2026, 5, 1, 6, 0, 0).unwrap(),
            duration_s: 600.0,
            distance_m: 1800.0,
            average_speed_mps: 3.0,
            max_speed_mps: 3.6,
            elevation_gain_m: 12.0,
            calories_kcal: 140.0,
            path: samples(points),
        }
    }
}
