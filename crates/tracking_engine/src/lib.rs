//! GPS activity tracking engine
//!
//! raw sample → [`PositionFilter`] → {[`geo`], [`MotionEstimator`]} →
//! session state machine ([`Tracker`]) → [`PathBuffer`] / summary.
//!
//! [`TrackerService`] runs a [`Tracker`] as the single writer on a tokio task.

pub mod calories;
pub mod error;
pub mod filter;
pub mod geo;
pub mod motion;
pub mod path;
pub mod runtime;
pub mod session;
pub mod signal;
pub mod tracker;

pub use calories::CalorieEstimator;
pub use error::{Result, TrackerError};
pub use filter::{FilterDecision, PositionFilter, RejectReason};
pub use geo::{accumulate, haversine_m, GeoDelta};
pub use motion::{MotionEstimator, MotionUpdate};
pub use path::PathBuffer;
pub use runtime::{TrackerEvent, TrackerHandle, TrackerService};
pub use session::{transition, ActivitySession, Command};
pub use signal::SignalMonitor;
pub use tracker::{SampleOutcome, Tracker};
