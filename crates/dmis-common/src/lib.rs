//! Common types and utilities shared across all dmis services.

pub mod error;
pub mod geojson;
pub mod time;

pub use error::{DmisError, DmisResult};
pub use geojson::{Crs, Feature, FeatureCollection, Geometry, Position, DEFAULT_WKID};
pub use time::{feed_date, filename_timestamp, freshness_label};
