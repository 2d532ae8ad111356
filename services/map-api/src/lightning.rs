//! Latest-data pipeline for the EarthNetworks lightning feed.
//!
//! The vendor publishes dated CSV files of strike observations to the
//! remote store. One call locates the newest file for the current day
//! (stepping back a day when today's file has not landed), caches it
//! locally, transcodes the rows into a GeoJSON FeatureCollection of
//! strike points, and appends the result to the dataset store.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use dmis_common::{
    filename_timestamp, freshness_label, DmisError, DmisResult, Feature, FeatureCollection,
};
use storage::{find_latest_for_date, DatasetStore, FeedSpec, RemoteStore, WeatherCache};

/// Case-insensitive first-line prefix marking a feed file with no new strikes.
const NO_DATA_SENTINEL: &str = "no updates since";

/// Label returned for fixture files instead of a parsed timestamp.
const TEST_DATA_LABEL: &str = "Test Data";

/// One vendor CSV data row.
#[derive(Debug, Deserialize)]
struct LightningRow {
    #[serde(rename = "Longitude")]
    longitude: f64,

    #[serde(rename = "Latitude")]
    latitude: f64,

    #[serde(rename = "LightningTime")]
    lightning_time: String,
}

/// Transcoded lightning data plus its human-readable freshness label.
#[derive(Debug, Clone, PartialEq)]
pub struct LightningSnapshot {
    pub collection: FeatureCollection,
    pub label: String,
}

/// Orchestrates the lightning feed end to end.
pub struct LightningPipeline {
    remote: Arc<RemoteStore>,
    cache: Arc<WeatherCache>,
    datasets: Arc<dyn DatasetStore>,
    feed: FeedSpec,
}

impl LightningPipeline {
    pub fn new(
        remote: Arc<RemoteStore>,
        cache: Arc<WeatherCache>,
        datasets: Arc<dyn DatasetStore>,
        feed: FeedSpec,
    ) -> Self {
        Self {
            remote,
            cache,
            datasets,
            feed,
        }
    }

    /// Fetch and transcode the newest lightning file.
    ///
    /// Transcoding and locator errors abort the whole request; no partial
    /// collection is ever returned. Persistence is best-effort: a storage
    /// failure is logged and the transcoded collection is still returned.
    #[instrument(skip(self), fields(source = %self.feed.source_name))]
    pub async fn latest(&self) -> DmisResult<LightningSnapshot> {
        let today = Utc::now().date_naive();
        let object = find_latest_for_date(&self.remote, &self.feed, today).await?;
        let path = self.cache.ensure_local(&self.remote, &object).await?;
        let text = tokio::fs::read_to_string(&path).await?;

        let file_name = object.file_name();
        if let Some(sentinel) = sentinel_line(&text) {
            info!(file = %file_name, "Feed file reports no new strikes");
            let collection = FeatureCollection::new().with_feature(Feature::placeholder());
            return Ok(LightningSnapshot {
                collection,
                label: sentinel,
            });
        }

        let collection = parse_lightning_csv(&text)?;
        collection.validate()?;

        match self
            .datasets
            .append(&self.feed.source_name, serde_json::to_value(&collection)?)
            .await
        {
            Ok(record_id) => info!(
                record_id,
                features = collection.features.len(),
                "Persisted lightning collection"
            ),
            Err(e) => warn!(error = %e, "Could not persist lightning collection"),
        }

        Ok(LightningSnapshot {
            collection,
            label: file_label(file_name)?,
        })
    }
}

/// The trimmed first line, when it matches the no-data sentinel.
fn sentinel_line(text: &str) -> Option<String> {
    let first = text.lines().next()?.trim();
    if first.to_lowercase().starts_with(NO_DATA_SENTINEL) {
        Some(first.to_string())
    } else {
        None
    }
}

/// Transcode vendor CSV rows into Point features.
///
/// Any unparseable row aborts the whole file.
fn parse_lightning_csv(text: &str) -> DmisResult<FeatureCollection> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut collection = FeatureCollection::new();
    for row in reader.deserialize::<LightningRow>() {
        let row = row.map_err(|e| DmisError::MalformedRecord(format!("lightning row: {}", e)))?;
        collection.features.push(
            Feature::point(row.longitude, row.latitude)
                .with_property("lightningTime", Value::String(row.lightning_time)),
        );
    }
    Ok(collection)
}

/// Freshness label for a feed file, derived from its embedded timestamp.
fn file_label(file_name: &str) -> DmisResult<String> {
    if file_name.contains("test") {
        return Ok(TEST_DATA_LABEL.to_string());
    }
    Ok(freshness_label(filename_timestamp(file_name)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_line_detected_case_insensitively() {
        let text = "No updates since 8/8/2017 3:23:56 PM\n";
        assert_eq!(
            sentinel_line(text),
            Some("No updates since 8/8/2017 3:23:56 PM".to_string())
        );

        let shouting = "NO UPDATES SINCE 8/8/2017 3:23:56 PM\n";
        assert!(sentinel_line(shouting).is_some());
    }

    #[test]
    fn test_header_line_is_not_a_sentinel() {
        assert_eq!(sentinel_line("Longitude,Latitude,LightningTime\n"), None);
    }

    #[test]
    fn test_parse_single_row() {
        let csv = "Longitude,Latitude,LightningTime\n10.5,5.5,2017-08-08T07:22:25\n";
        let collection = parse_lightning_csv(csv).unwrap();

        assert_eq!(collection.features.len(), 1);
        let feature = &collection.features[0];
        match &feature.geometry {
            Some(dmis_common::Geometry::Point { coordinates }) => {
                assert_eq!(coordinates, &[10.5, 5.5]);
            }
            other => panic!("Expected Point geometry, got {:?}", other),
        }
        assert_eq!(
            feature.properties.get("lightningTime"),
            Some(&Value::String("2017-08-08T07:22:25".to_string()))
        );
    }

    #[test]
    fn test_parse_rejects_non_numeric_coordinate() {
        let csv = "Longitude,Latitude,LightningTime\nnope,5.5,2017-08-08T07:22:25\n";
        assert!(matches!(
            parse_lightning_csv(csv),
            Err(DmisError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_parse_trims_padded_fields() {
        let csv = "Longitude, Latitude, LightningTime\n 10.5 , 5.5 , 2017-08-08T07:22:25\n";
        let collection = parse_lightning_csv(csv).unwrap();
        assert_eq!(collection.features.len(), 1);
    }

    #[test]
    fn test_file_label_parses_vendor_filename() {
        let label = file_label("pplnneedlx_20170808_072225.csv").unwrap();
        assert_eq!(label, "08-Aug-2017 07:22:25");
    }

    #[test]
    fn test_file_label_short_circuits_for_fixtures() {
        let label = file_label("test_lightning.csv").unwrap();
        assert_eq!(label, "Test Data");
    }

    #[test]
    fn test_file_label_rejects_unparseable_filename() {
        assert!(matches!(
            file_label("lightning.csv"),
            Err(DmisError::MalformedRecord(_))
        ));
    }
}
