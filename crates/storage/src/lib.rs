//! Storage abstractions for dmis services.
//!
//! Provides unified interfaces for:
//! - The remote object store (S3) holding vendor data feeds
//! - The local cache of downloaded feed files
//! - PostgreSQL for ingested dataset payloads

pub mod dataset_store;
pub mod locator;
pub mod object_store;
pub mod weather_cache;

pub use self::object_store::{RemoteObjectRef, RemoteStore, RemoteStoreConfig};
pub use dataset_store::{DatasetRecord, DatasetStore, MemoryDatasetStore, PgDatasetStore};
pub use locator::{find_latest_for_date, FeedSpec};
pub use weather_cache::WeatherCache;
