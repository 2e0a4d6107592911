//! LocationSource trait - platform location provider abstraction
//!
//! Real providers, the simulator and file replay all deliver `LocationEvent`s
//! through the same callback, so the ingestion adapter never knows which one it
//! is talking to.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::{AcquisitionStatus, RawFix};

/// Provider error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderError {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
}

impl ProviderError {
    /// Acquisition status the engine reports after this error
    pub fn acquisition_status(&self) -> AcquisitionStatus {
        match self {
            ProviderError::PermissionDenied => AcquisitionStatus::PermissionDenied,
            ProviderError::PositionUnavailable => AcquisitionStatus::PositionUnavailable,
            ProviderError::Timeout => AcquisitionStatus::TimedOut,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderError::PermissionDenied => "permission_denied",
            ProviderError::PositionUnavailable => "position_unavailable",
            ProviderError::Timeout => "timeout",
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event from the location provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationEvent {
    Fix(RawFix),
    Error(ProviderError),
}

/// Location event callback type
pub type LocationCallback = Arc<dyn Fn(LocationEvent) + Send + Sync>;

/// Location provider trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn LocationSource> = get_location_source();
/// source.listen(Arc::new(|event| {
///     println!("event: {:?}", event);
/// }));
/// // ...
/// source.stop();
/// ```
pub trait LocationSource: Send + Sync {
    /// Provider name (used for logging/metrics)
    fn source_name(&self) -> &str;

    /// Register the event callback
    ///
    /// Repeated calls while already listening are ignored.
    fn listen(&self, callback: LocationCallback);

    /// Stop delivering events
    fn stop(&self);

    fn is_listening(&self) -> bool;
}
