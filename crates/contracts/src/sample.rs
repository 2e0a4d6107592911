//! PositionSample - Ingestion output
//!
//! One accepted-or-not location fix and the small geometry types derived from it.

use serde::{Deserialize, Serialize};

/// One location fix.
///
/// Immutable once created. `captured_at` is on the provider's monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    /// Latitude (degrees, WGS84)
    pub latitude: f64,

    /// Longitude (degrees, WGS84)
    pub longitude: f64,

    /// Altitude (meters)
    #[serde(default)]
    pub altitude: Option<f64>,

    /// Horizontal accuracy radius (meters)
    pub accuracy: f64,

    /// Sensor-reported ground speed (m/s)
    #[serde(default)]
    pub speed: Option<f64>,

    /// Heading (degrees from true north)
    #[serde(default)]
    pub heading: Option<f64>,

    /// Capture timestamp (seconds, monotonic)
    pub captured_at: f64,
}

impl PositionSample {
    /// Minimal fix with only the required fields set
    pub fn new(latitude: f64, longitude: f64, accuracy: f64, captured_at: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy,
            speed: None,
            heading: None,
            captured_at,
        }
    }

    /// Builder-style altitude setter
    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    /// Latitude/longitude pair for renderers
    #[inline]
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.latitude,
            lng: self.longitude,
        }
    }
}

/// Raw provider event, as delivered by the platform location API
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawFix {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: Option<f64>,
    pub accuracy: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub heading: Option<f64>,
    /// Provider timestamp (seconds)
    pub timestamp: f64,
}

/// Map coordinate in the shape renderers expect
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Axis-aligned lat/lng bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    /// Degenerate box around a single point
    pub fn around(point: GeoPoint) -> Self {
        Self {
            south: point.lat,
            west: point.lng,
            north: point.lat,
            east: point.lng,
        }
    }

    /// Grow the box to include `point`
    pub fn extend(&mut self, point: GeoPoint) {
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
        self.west = self.west.min(point.lng);
        self.east = self.east.max(point.lng);
    }

    /// True if `other` lies fully inside this box
    pub fn contains(&self, other: &GeoBounds) -> bool {
        other.south >= self.south
            && other.north <= self.north
            && other.west >= self.west
            && other.east <= self.east
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_extend() {
        let mut bounds = GeoBounds::around(GeoPoint { lat: 1.0, lng: 1.0 });
        bounds.extend(GeoPoint { lat: 2.0, lng: -1.0 });

        assert_eq!(bounds.south, 1.0);
        assert_eq!(bounds.north, 2.0);
        assert_eq!(bounds.west, -1.0);
        assert_eq!(bounds.east, 1.0);
    }

    #[test]
    fn test_bounds_contains() {
        let mut outer = GeoBounds::around(GeoPoint { lat: 0.0, lng: 0.0 });
        outer.extend(GeoPoint { lat: 1.0, lng: 1.0 });
        let inner = GeoBounds::around(GeoPoint { lat: 0.5, lng: 0.5 });

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
    }

    #[test]
    fn test_sample_serde_optional_fields() {
        let json = r#"{"latitude":1.0,"longitude":2.0,"accuracy":5.0,"captured_at":3.0}"#;
        let sample: PositionSample = serde_json::from_str(json).unwrap();
        assert_eq!(sample.altitude, None);
        assert_eq!(sample.speed, None);
        assert_eq!(sample.point(), GeoPoint { lat: 1.0, lng: 2.0 });
    }
}
