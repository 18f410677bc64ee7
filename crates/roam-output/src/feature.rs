//! Output feature construction

use std::collections::HashMap;

use serde_json::{Map, Value, json};

/// One successful row, ready to be written as a GeoJSON feature
///
/// Carries the row's original field map untouched - whatever columns the
/// upload had ride along as string properties, with the routing results
/// layered on top.
#[derive(Debug, Clone)]
pub struct RouteFeature {
    /// Zero-based row index in the upload
    pub row_index: u64,
    /// Original field values from the row
    pub fields: HashMap<String, String>,
    /// Road distance in metres
    pub distance: f64,
    /// Travel time in seconds
    pub duration: f64,
    /// Post-processed polyline; `None` when geometry export is off
    pub line: Option<Vec<[f64; 2]>>,
}

impl RouteFeature {
    /// Render as a GeoJSON feature value
    pub fn to_geojson(&self) -> Value {
        let mut properties = Map::with_capacity(self.fields.len() + 5);
        for (name, value) in &self.fields {
            properties.insert(name.clone(), Value::String(value.clone()));
        }
        properties.insert("distance".into(), json!(self.distance));
        properties.insert("duration".into(), json!(self.duration));
        properties.insert("distance_km".into(), json!(round_km(self.distance)));
        properties.insert(
            "duration_minutes".into(),
            json!(round_minutes(self.duration)),
        );
        properties.insert("rowIndex".into(), json!(self.row_index));

        let geometry = match &self.line {
            Some(line) => json!({
                "type": "LineString",
                "coordinates": line,
            }),
            None => Value::Null,
        };

        json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": Value::Object(properties),
        })
    }
}

/// Metres to kilometres with two decimals
fn round_km(metres: f64) -> f64 {
    (metres / 10.0).round() / 100.0
}

/// Seconds to minutes with two decimals
fn round_minutes(seconds: f64) -> f64 {
    (seconds / 60.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounding() {
        assert_eq!(round_km(1234.5), 1.23);
        assert_eq!(round_km(1235.0), 1.24);
        assert_eq!(round_minutes(90.0), 1.5);
        assert_eq!(round_minutes(100.0), 1.67);
    }

    #[test]
    fn test_feature_shape() {
        let feature = RouteFeature {
            row_index: 7,
            fields: HashMap::from([("name".to_string(), "trip A".to_string())]),
            distance: 1500.0,
            duration: 120.0,
            line: Some(vec![[2.35, 48.85], [2.29, 48.87]]),
        };
        let value = feature.to_geojson();

        assert_eq!(value["type"], "Feature");
        assert_eq!(value["geometry"]["type"], "LineString");
        assert_eq!(value["properties"]["name"], "trip A");
        assert_eq!(value["properties"]["distance"], 1500.0);
        assert_eq!(value["properties"]["distance_km"], 1.5);
        assert_eq!(value["properties"]["duration_minutes"], 2.0);
        assert_eq!(value["properties"]["rowIndex"], 7);
    }

    #[test]
    fn test_feature_without_geometry() {
        let feature = RouteFeature {
            row_index: 0,
            fields: HashMap::new(),
            distance: 10.0,
            duration: 1.0,
            line: None,
        };
        assert!(feature.to_geojson()["geometry"].is_null());
    }
}
