//! ActivityStore trait - persistence collaborator interface

use crate::{ActivitySummary, ContractError};

/// Finished-activity persistence
///
/// Receives each completed summary exactly once. Failures are reported back,
/// never retried by the caller.
#[trait_variant::make(ActivityStore: Send)]
pub trait LocalActivityStore {
    /// Store name (used for logging/metrics)
    fn name(&self) -> &str;

    async fn save(&mut self, summary: &ActivitySummary) -> Result<(), ContractError>;

    /// Flush pending writes (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;
}
