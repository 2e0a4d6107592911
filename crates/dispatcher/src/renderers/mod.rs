//! Map renderer adapters

pub mod geojson;
pub mod log;
pub mod network;

pub use geojson::GeoJsonRenderer;
pub use log::LogRenderer;
pub use network::{NetworkFormat, NetworkRenderer, NetworkRendererConfig};
