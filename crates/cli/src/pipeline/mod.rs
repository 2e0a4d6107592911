//! Tracking pipeline orchestration module.

mod control;
mod orchestrator;
mod stats;

pub use control::{ControlAction, ControlScript};
pub use orchestrator::{Pipeline, PipelineConfig, SourceSelection};
pub use stats::RunReport;
