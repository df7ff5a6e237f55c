//! Uniquely identified geographic points.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Property key holding the root infrastructure id a coordinate was connected through.
pub const SOURCE_PROPERTY: &str = "source";

/// A geographic point with a stable identity.
///
/// Identity is `coordinate_id`; the location never changes after creation.
/// `properties` carries transient annotations such as the resolved source
/// assigned by the greedy connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniqueCoordinate {
    pub coordinate_id: String,
    /// (lat, lon) in degrees
    pub coordinate: (f64, f64),
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
}

impl UniqueCoordinate {
    pub fn new(coordinate_id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            coordinate_id: coordinate_id.into(),
            coordinate: (lat, lon),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.coordinate_id
    }

    #[inline]
    pub fn lat(&self) -> f64 {
        self.coordinate.0
    }

    #[inline]
    pub fn lon(&self) -> f64 {
        self.coordinate.1
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(key.into(), value.into());
    }

    /// Root source id recorded by the greedy connector, if any.
    pub fn source(&self) -> Option<&str> {
        self.properties.get(SOURCE_PROPERTY).and_then(Value::as_str)
    }

    /// True when the id is non-empty and the location is a finite lat/lon pair.
    pub fn is_valid(&self) -> bool {
        let (lat, lon) = self.coordinate;
        !self.coordinate_id.is_empty()
            && lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_properties_roundtrip_through_json() {
        let coord = UniqueCoordinate::new("school-1", -1.5, 30.2).with_property(SOURCE_PROPERTY, "fiber-7");
        let json = serde_json::to_string(&coord).unwrap();
        assert!(json.contains("\"coordinate\":[-1.5,30.2]"));

        let back: UniqueCoordinate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, coord);
        assert_eq!(back.source(), Some("fiber-7"));
    }

    #[test]
    fn test_missing_properties_default_to_empty() {
        let coord: UniqueCoordinate =
            serde_json::from_str(r#"{"coordinate_id": "a", "coordinate": [1.0, 2.0]}"#).unwrap();
        assert!(coord.properties.is_empty());
        assert_eq!(coord.lat(), 1.0);
        assert_eq!(coord.lon(), 2.0);
    }

    #[test]
    fn test_validity() {
        assert!(UniqueCoordinate::new("a", 10.0, 20.0).is_valid());
        assert!(!UniqueCoordinate::new("", 10.0, 20.0).is_valid());
        assert!(!UniqueCoordinate::new("a", f64::NAN, 20.0).is_valid());
        assert!(!UniqueCoordinate::new("a", 95.0, 20.0).is_valid());
    }
}
