//! MapRenderer trait - map collaborator interface
//!
//! One interface for every map SDK adapter. The engine only ever hands out a
//! growing path, the latest position and the bounds that contain the path.

use serde::Serialize;

use crate::{ContractError, GeoBounds, GeoPoint, LiveMetrics, PathView, SessionId};

/// Map renderer trait
#[trait_variant::make(MapRenderer: Send)]
pub trait LocalMapRenderer {
    /// Renderer name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Redraw the route from the full ordered path
    async fn draw_path(&mut self, path: &PathView) -> Result<(), ContractError>;

    /// Move the current-position marker
    async fn update_current_position(&mut self, position: &GeoPoint) -> Result<(), ContractError>;

    /// Fit the view to `bounds`
    async fn set_view_bounds(&mut self, bounds: &GeoBounds) -> Result<(), ContractError>;

    /// Release the renderer
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Produced once per accepted sample and pushed to renderers
#[derive(Debug, Clone, Serialize)]
pub struct TrackUpdate {
    pub session_id: SessionId,
    /// Latest accepted position
    pub position: GeoPoint,
    /// Path snapshot including `position`
    pub path: PathView,
    /// Bounding box of `path`
    pub bounds: GeoBounds,
    /// Live metrics right after the sample was applied
    pub metrics: LiveMetrics,
}
