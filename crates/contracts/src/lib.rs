//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Uses the location provider's monotonic timestamp (seconds, f64) as primary clock
//! - Wall-clock time (`chrono::Utc`) only appears in `startedAt` and display fields

mod activity;
mod blueprint;
mod error;
mod location_source;
mod path;
mod renderer;
mod sample;
mod session_id;
mod store;
mod tracker_config;

pub use activity::*;
pub use blueprint::*;
pub use error::*;
pub use location_source::{LocationCallback, LocationEvent, LocationSource, ProviderError};
pub use path::PathView;
pub use renderer::*;
pub use sample::*;
pub use session_id::SessionId;
pub use store::*;
pub use tracker_config::*;
