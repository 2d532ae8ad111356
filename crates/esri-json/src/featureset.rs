//! ArcGIS featureset documents to GeoJSON FeatureCollections.

use dmis_common::{DmisError, DmisResult, Feature, FeatureCollection, DEFAULT_WKID};
use serde_json::{Map, Value};

use crate::geometry::geometry_to_geojson;

/// Copy featureset attributes into GeoJSON properties.
///
/// Attribute names and values pass through untouched; non-object input
/// yields an empty map.
pub fn attributes_to_properties(attributes: &Value) -> Map<String, Value> {
    match attributes.as_object() {
        Some(map) => map.clone(),
        None => Map::new(),
    }
}

/// Convert a whole ArcGIS featureset into a FeatureCollection.
///
/// The collection carries a named CRS from `spatialReference.wkid`,
/// defaulting to EPSG:3857 when the featureset does not declare one.
pub fn featureset_to_geojson(featureset: &Value) -> DmisResult<FeatureCollection> {
    let features = featureset
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            DmisError::MalformedRecord("featureset without a features array".to_string())
        })?;

    let mut collection = FeatureCollection::new();
    for entry in features {
        let geometry = entry.get("geometry").ok_or_else(|| {
            DmisError::MalformedRecord(format!("feature without geometry: {}", entry))
        })?;
        let geometry = geometry_to_geojson(geometry)?;
        let properties =
            attributes_to_properties(entry.get("attributes").unwrap_or(&Value::Null));
        collection = collection.with_feature(Feature::new(geometry).with_properties(properties));
    }

    Ok(collection.attach_crs(wkid(featureset)))
}

fn wkid(featureset: &Value) -> i32 {
    featureset
        .get("spatialReference")
        .and_then(|sr| sr.get("wkid"))
        .and_then(Value::as_i64)
        .map(|id| id as i32)
        .unwrap_or(DEFAULT_WKID)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dmis_common::Geometry;
    use serde_json::json;

    #[test]
    fn test_featureset_conversion() {
        let fc = featureset_to_geojson(&json!({
            "spatialReference": {"wkid": 4326},
            "features": [
                {
                    "geometry": {"x": -95.3, "y": 29.7},
                    "attributes": {"site": "buffalo-bayou", "stage_ft": 32.5}
                },
                {
                    "geometry": {"x": -95.1, "y": 29.8},
                    "attributes": {"site": "greens-bayou", "stage_ft": 18.0}
                }
            ]
        }))
        .unwrap();

        assert_eq!(fc.features.len(), 2);
        assert_eq!(
            fc.features[0].geometry,
            Some(Geometry::Point {
                coordinates: [-95.3, 29.7]
            })
        );
        assert_eq!(
            fc.features[0].properties.get("site"),
            Some(&json!("buffalo-bayou"))
        );
        assert_eq!(fc.crs.as_ref().unwrap().properties.name, "EPSG:4326");
        assert!(fc.validate().is_ok());
    }

    #[test]
    fn test_featureset_defaults_to_web_mercator() {
        let fc = featureset_to_geojson(&json!({
            "features": [{"geometry": {"x": 1.0, "y": 2.0}, "attributes": {}}]
        }))
        .unwrap();
        assert_eq!(fc.crs.as_ref().unwrap().properties.name, "EPSG:3857");
    }

    #[test]
    fn test_featureset_without_features_rejected() {
        let result = featureset_to_geojson(&json!({"rows": []}));
        assert!(matches!(result, Err(DmisError::MalformedRecord(_))));
    }

    #[test]
    fn test_feature_without_geometry_rejected() {
        let result = featureset_to_geojson(&json!({
            "features": [{"attributes": {"site": "x"}}]
        }));
        assert!(matches!(result, Err(DmisError::MalformedRecord(_))));
    }

    #[test]
    fn test_attributes_pass_through_unchanged() {
        let properties = attributes_to_properties(&json!({
            "OBJECTID": 7,
            "nested": {"a": [1, 2, 3]},
            "empty": null
        }));
        assert_eq!(properties.get("OBJECTID"), Some(&json!(7)));
        assert_eq!(properties.get("nested"), Some(&json!({"a": [1, 2, 3]})));
        assert_eq!(properties.get("empty"), Some(&json!(null)));
    }

    #[test]
    fn test_non_object_attributes_yield_empty_map() {
        assert!(attributes_to_properties(&json!("not-a-map")).is_empty());
        assert!(attributes_to_properties(&json!(null)).is_empty());
    }
}
