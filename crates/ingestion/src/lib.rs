//! # Ingestion Pipeline
//!
//! Location ingestion module.
//!
//! Responsibilities:
//! - Register location sources (platform provider, simulator, replay)
//! - Normalize raw fixes into `PositionSample`
//! - Backpressure management and drop policy
//! - Send to downstream via async-channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, LocationUpdate, SimulatedLocationSource};
//!
//! let mut pipeline = IngestionPipeline::new(256);
//! pipeline.register_source(Box::new(SimulatedLocationSource::new(Default::default())), None)?;
//!
//! let rx = pipeline.take_receiver().unwrap();
//! pipeline.start_all();
//! while let Ok(update) = rx.recv().await {
//!     // feed the tracker
//! }
//! ```

mod adapter;
mod config;
mod error;
mod normalize;
mod pipeline;
mod replay;
mod simulated;

// Re-exports
pub use adapter::{send_update, LocationUpdate, SourceAdapter};
pub use config::{BackpressureConfig, DropPolicy, IngestionMetrics, MetricsSnapshot};
pub use error::{IngestionError, Result};
pub use normalize::normalize_fix;
pub use pipeline::IngestionPipeline;
pub use replay::{ReplayConfig, ReplayLocationSource};
pub use simulated::{SimulatedLocationSource, SimulatedSourceConfig};
