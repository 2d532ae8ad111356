//! Application state and shared resources.

use anyhow::Result;
use std::sync::Arc;

use storage::{DatasetStore, PgDatasetStore, RemoteStore, WeatherCache};

use crate::config::AppConfig;
use crate::lightning::LightningPipeline;

/// Shared application state.
pub struct AppState {
    pub config: AppConfig,
    pub remote: Arc<RemoteStore>,
    pub cache: Arc<WeatherCache>,
    pub datasets: Arc<dyn DatasetStore>,
    pub lightning: LightningPipeline,
    pub http: reqwest::Client,
}

impl AppState {
    pub async fn new() -> Result<Self> {
        let config = AppConfig::from_env();

        let remote = Arc::new(RemoteStore::new(&config.remote_store)?);
        let cache = Arc::new(WeatherCache::new(
            &config.cache_dir,
            config.cache_retention_days,
        ));

        let store = PgDatasetStore::connect(&config.database_url).await?;
        store.migrate().await?;
        let datasets: Arc<dyn DatasetStore> = Arc::new(store);

        let lightning = LightningPipeline::new(
            remote.clone(),
            cache.clone(),
            datasets.clone(),
            config.lightning_feed.clone(),
        );

        Ok(Self {
            config,
            remote,
            cache,
            datasets,
            lightning,
            http: reqwest::Client::new(),
        })
    }
}
