//! ArcGIS JSON to GeoJSON transcoding.
//!
//! Converts the Esri geometry dialect (`x`/`y`, `points`, `paths`, `rings`)
//! into the GeoJSON model from `dmis-common`. Pure data transformation, no
//! I/O. Encodings outside the dialect are rejected rather than guessed at.

pub mod featureset;
pub mod geometry;

pub use featureset::{attributes_to_properties, featureset_to_geojson};
pub use geometry::geometry_to_geojson;
