//! GeoJsonRenderer - keeps a GeoJSON FeatureCollection file in sync with the route
//!
//! 每次 draw_path 都整体重写文件（先写临时文件再 rename），
//! 外部地图工具轮询该文件即可看到最新路线。

use chrono::Utc;
use contracts::{ContractError, GeoBounds, GeoPoint, MapRenderer, PathView};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, instrument};

/// Renderer that writes the route as GeoJSON
pub struct GeoJsonRenderer {
    name: String,
    path: PathBuf,
    position: Option<GeoPoint>,
    bounds: Option<GeoBounds>,
}

impl GeoJsonRenderer {
    /// Create a renderer writing to `path`; parent directories are created
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            name: name.into(),
            path,
            position: None,
            bounds: None,
        })
    }

    /// Create from params map (`path` required)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let path = params.get("path").ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing 'path' parameter")
        })?;
        Self::new(name, path)
    }

    fn feature_collection(&self, route: &PathView) -> Value {
        // GeoJSON positions are [lng, lat(, alt)]
        let coordinates: Vec<Value> = route
            .iter()
            .map(|s| match s.altitude {
                Some(alt) => json!([s.longitude, s.latitude, alt]),
                None => json!([s.longitude, s.latitude]),
            })
            .collect();

        let mut features = vec![json!({
            "type": "Feature",
            "properties": { "name": "route", "points": route.len() },
            "geometry": { "type": "LineString", "coordinates": coordinates },
        })];

        if let Some(position) = self.position {
            features.push(json!({
                "type": "Feature",
                "properties": { "name": "current_position" },
                "geometry": { "type": "Point", "coordinates": [position.lng, position.lat] },
            }));
        }

        let mut collection = json!({
            "type": "FeatureCollection",
            "properties": { "updated_at": Utc::now().to_rfc3339() },
            "features": features,
        });
        if let Some(b) = self.bounds {
            collection["bbox"] = json!([b.west, b.south, b.east, b.north]);
        }
        collection
    }

    fn write_atomically(&self, value: &Value) -> std::io::Result<()> {
        let tmp = self.path.with_extension("geojson.tmp");
        let bytes = serde_json::to_vec(value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, &self.path)
    }
}

impl MapRenderer for GeoJsonRenderer {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "geojson_renderer_draw_path",
        skip(self, path),
        fields(renderer = %self.name, points = path.len())
    )]
    async fn draw_path(&mut self, path: &PathView) -> Result<(), ContractError> {
        let collection = self.feature_collection(path);
        self.write_atomically(&collection)
            .map_err(|e| ContractError::renderer(&self.name, e.to_string()))?;
        debug!(renderer = %self.name, file = %self.path.display(), "GeoJSON written");
        Ok(())
    }

    async fn update_current_position(&mut self, position: &GeoPoint) -> Result<(), ContractError> {
        self.position = Some(*position);
        Ok(())
    }

    async fn set_view_bounds(&mut self, bounds: &GeoBounds) -> Result<(), ContractError> {
        self.bounds = Some(*bounds);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(renderer = %self.name, "GeoJsonRenderer closed");
        Ok(())
    }
}
