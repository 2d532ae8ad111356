//! Map request dispatch.
//!
//! One endpoint serves two protocols: `wms` requests are reverse-proxied
//! verbatim to the external map server, `geojson` requests resolve a layer
//! source name against the lightning pipeline or the dataset store.

use axum::{
    body::Body,
    extract::{Extension, Path, Query, RawQuery},
    http::{header, StatusCode},
    response::Response,
};
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, instrument};

use dmis_common::{DmisError, DmisResult};

use super::common::error_response;
use crate::state::AppState;

/// Response header carrying the freshness label of a GeoJSON layer.
pub const DATA_UPDATED_HEADER: &str = "X-Data-Updated";

/// Outcome of one dispatched map request.
#[derive(Debug)]
pub struct MapResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Bytes,

    /// Freshness label, set only for GeoJSON layers with one.
    pub data_updated: Option<String>,
}

/// GET /map/:protocol - Dispatch a map request by protocol
#[instrument(skip(state, params))]
pub async fn map_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(protocol): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    RawQuery(query): RawQuery,
) -> Response {
    match route_map_request(&state, &protocol, &params, query.as_deref()).await {
        Ok(map) => {
            let mut builder = Response::builder()
                .status(
                    StatusCode::from_u16(map.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                )
                .header(header::CONTENT_TYPE, map.content_type);
            if let Some(label) = map.data_updated {
                builder = builder.header(DATA_UPDATED_HEADER, label);
            }
            builder.body(Body::from(map.body)).unwrap()
        }
        Err(e) => error_response(&e),
    }
}

/// Dispatch by protocol. Anything other than `wms` or `geojson` is a
/// client error.
pub async fn route_map_request(
    state: &AppState,
    protocol: &str,
    params: &HashMap<String, String>,
    raw_query: Option<&str>,
) -> DmisResult<MapResponse> {
    match protocol.to_lowercase().as_str() {
        "wms" => proxy_map_server(state, protocol, raw_query).await,
        "geojson" => geojson_layer(state, params).await,
        other => Err(DmisError::ClientError(format!(
            "Unknown map protocol: {}",
            other
        ))),
    }
}

/// Forward the raw query string to the external map server and relay its
/// status, content-type, and body unchanged.
async fn proxy_map_server(
    state: &AppState,
    protocol: &str,
    raw_query: Option<&str>,
) -> DmisResult<MapResponse> {
    let base = state.config.map_server_url.trim_end_matches('/');
    let mut url = format!(
        "{}/{}/{}",
        base, state.config.map_server_namespace, protocol
    );
    if let Some(query) = raw_query {
        if !query.is_empty() {
            url = format!("{}?{}", url, query);
        }
    }

    let response = state
        .http
        .get(&url)
        .send()
        .await
        .map_err(|e| DmisError::InternalError(format!("Map server unreachable: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        // Relayed as-is; upstream errors are not reinterpreted here.
        error!(status = %status, url = %url, "Map server returned an error status");
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let body = response
        .bytes()
        .await
        .map_err(|e| DmisError::InternalError(format!("Map server read failed: {}", e)))?;

    Ok(MapResponse {
        status: status.as_u16(),
        content_type,
        body,
        data_updated: None,
    })
}

/// Serve a GeoJSON layer by source name.
async fn geojson_layer(
    state: &AppState,
    params: &HashMap<String, String>,
) -> DmisResult<MapResponse> {
    let source = params
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("layersource"))
        .map(|(_, value)| value.as_str())
        .ok_or_else(|| DmisError::ClientError("Missing layerSource parameter".to_string()))?;

    if source == state.config.lightning_feed.source_name {
        let snapshot = state.lightning.latest().await?;
        return Ok(MapResponse {
            status: 200,
            content_type: "application/json".to_string(),
            body: serde_json::to_vec(&snapshot.collection)?.into(),
            data_updated: Some(snapshot.label),
        });
    }

    let sources = state.datasets.list_sources().await?;
    if !sources.iter().any(|known| known == source) {
        return Err(DmisError::ClientError(format!(
            "Unknown geojson layer source: {}",
            source
        )));
    }

    let payload = state.datasets.latest(source).await?;
    Ok(MapResponse {
        status: 200,
        content_type: "application/json".to_string(),
        body: serde_json::to_vec(&payload)?.into(),
        data_updated: None,
    })
}
