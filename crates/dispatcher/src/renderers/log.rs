//! LogRenderer - logs path/marker updates via tracing

use contracts::{ContractError, GeoBounds, GeoPoint, MapRenderer, PathView};
use tracing::{debug, info, instrument};

/// Renderer that only logs what a map would draw
pub struct LogRenderer {
    name: String,
    draws: u64,
}

impl LogRenderer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            draws: 0,
        }
    }
}

impl MapRenderer for LogRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_renderer_draw_path",
        skip(self, path),
        fields(renderer = %self.name, points = path.len())
    )]
    async fn draw_path(&mut self, path: &PathView) -> Result<(), ContractError> {
        self.draws += 1;
        if let Some(last) = path.last() {
            info!(
                renderer = %self.name,
                points = path.len(),
                lat = last.latitude,
                lng = last.longitude,
                "Route redrawn"
            );
        }
        Ok(())
    }

    async fn update_current_position(&mut self, position: &GeoPoint) -> Result<(), ContractError> {
        debug!(renderer = %self.name, lat = position.lat, lng = position.lng, "Marker moved");
        Ok(())
    }

    async fn set_view_bounds(&mut self, bounds: &GeoBounds) -> Result<(), ContractError> {
        debug!(
            renderer = %self.name,
            south = bounds.south,
            west = bounds.west,
            north = bounds.north,
            east = bounds.east,
            "View bounds updated"
        );
        Ok(())
    }

    #[instrument(name = "log_renderer_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(renderer = %self.name, draws = self.draws, "LogRenderer closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::track_update;

    #[tokio::test]
    async fn test_log_renderer_draw() {
        let mut renderer = LogRenderer::new("test_log");
        let update = track_update("act-1", 3);

        assert!(renderer.draw_path(&update.path).await.is_ok());
        assert!(renderer.update_current_position(&update.position).await.is_ok());
        assert_eq!(renderer.draws, 1);
    }

    #[tokio::test]
    async fn test_log_renderer_name() {
        let renderer = LogRenderer::new("my_map");
        assert_eq!(renderer.name(), "my_map");
    }
}
