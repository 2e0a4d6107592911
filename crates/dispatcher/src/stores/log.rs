//! LogStore - logs finished activities via tracing

use contracts::{ActivityStore, ActivitySummary, ContractError};
use tracing::info;

/// Store that only logs the summary
pub struct LogStore {
    name: String,
    saved: u64,
}

impl LogStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            saved: 0,
        }
    }
}

impl ActivityStore for LogStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn save(&mut self, summary: &ActivitySummary) -> Result<(), ContractError> {
        self.saved += 1;
        info!(
            store = %self.name,
            session_id = %summary.session_id,
            kind = %summary.activity_kind,
            started_at = %summary.started_at,
            duration_s = summary.duration_s,
            distance_m = summary.distance_m,
            avg_speed_mps = summary.average_speed_mps,
            max_speed_mps = summary.max_speed_mps,
            elevation_gain_m = summary.elevation_gain_m,
            calories_kcal = summary.calories_kcal,
            points = summary.path.len(),
            "Activity completed"
        );
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        info!(store = %self.name, saved = self.saved, "LogStore flushed");
        Ok(())
    }
}
