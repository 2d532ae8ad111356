//! HTTP request handlers for the map-api service.
//!
//! This module is organized into submodules:
//! - `maps`: map request dispatch (WMS reverse proxy, GeoJSON layers)
//! - `data`: pushed dataset ingestion
//! - `common`: shared utilities (error payloads, health check)

pub mod common;
pub mod data;
pub mod maps;

pub use common::{error_response, health_handler, HealthResponse};

pub use data::{data_push_handler, store_push, PushResponse};

pub use maps::{map_handler, route_map_request, MapResponse, DATA_UPDATED_HEADER};
