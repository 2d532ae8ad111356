//! Pushed dataset ingestion.
//!
//! External collaborators push raw payloads for named sources. ArcGIS
//! featureset payloads are transcoded to GeoJSON before they are stored;
//! any other JSON is stored verbatim.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use dmis_common::{DmisError, DmisResult};
use esri_json::featureset_to_geojson;

use super::common::error_response;
use crate::state::AppState;

/// Response for a stored push payload.
#[derive(Debug, Serialize)]
pub struct PushResponse {
    pub success: bool,
    pub message: String,
    pub source: String,
    pub record_id: i64,
}

/// PUT /data/:source - Store a pushed payload
pub async fn data_push_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(source): Path<String>,
    Json(payload): Json<Value>,
) -> Response {
    let id = Uuid::new_v4().to_string();

    info!(id = %id, source = %source, "Received data push");

    match store_push(&state, &source, payload).await {
        Ok(record_id) => {
            info!(id = %id, record_id, "Stored pushed payload");

            (
                StatusCode::CREATED,
                Json(PushResponse {
                    success: true,
                    message: format!("Stored payload for {}", source),
                    source,
                    record_id,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(id = %id, source = %source, error = %e, "Data push failed");
            error_response(&e)
        }
    }
}

/// Validate the source name, transcode ArcGIS payloads, and append the
/// result to the dataset store.
pub async fn store_push(state: &AppState, source: &str, payload: Value) -> DmisResult<i64> {
    if !state.config.push_sources.iter().any(|s| s == source) {
        return Err(DmisError::ClientError(format!(
            "Unknown push source: {}",
            source
        )));
    }

    let payload = if is_arcgis_featureset(&payload) {
        serde_json::to_value(featureset_to_geojson(&payload)?)?
    } else {
        payload
    };

    state.datasets.append(source, payload).await
}

/// An ArcGIS featureset carries a `features` array of entries holding
/// `geometry`/`attributes` members rather than GeoJSON's tagged features.
fn is_arcgis_featureset(payload: &Value) -> bool {
    payload
        .get("features")
        .and_then(Value::as_array)
        .and_then(|features| features.first())
        .map(|entry| {
            entry.get("attributes").is_some()
                || (entry.get("geometry").is_some() && entry.get("type").is_none())
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_arcgis_featureset_detected() {
        let arcgis = json!({
            "features": [
                {"geometry": {"x": 1.0, "y": 2.0}, "attributes": {"name": "gauge 1"}}
            ]
        });
        assert!(is_arcgis_featureset(&arcgis));
    }

    #[test]
    fn test_geojson_collection_not_detected_as_arcgis() {
        let geojson = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                    "properties": {}
                }
            ]
        });
        assert!(!is_arcgis_featureset(&geojson));
    }

    #[test]
    fn test_other_payloads_not_detected_as_arcgis() {
        assert!(!is_arcgis_featureset(&json!({"reading": 4.2})));
        assert!(!is_arcgis_featureset(&json!({"features": []})));
        assert!(!is_arcgis_featureset(&json!([1, 2, 3])));
    }
}
