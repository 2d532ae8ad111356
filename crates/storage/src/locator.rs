//! Latest-object lookup for daily vendor feeds.
//!
//! Feed vendors drop files named `{prefix}{YYYYMMDD}_{HHMMSS}.{ext}` into a
//! bucket directory, several per day. Serving "the current file" means
//! finding the newest upload for a date, with one special case: early in the
//! UTC day the vendor may not have produced today's first file yet, so a
//! lookup for today falls back to yesterday once.

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};

use dmis_common::{feed_date, DmisError, DmisResult};

use crate::object_store::{RemoteObjectRef, RemoteStore};

/// Identifies one daily feed within the remote store.
#[derive(Debug, Clone)]
pub struct FeedSpec {
    /// Directory the feed's objects live under
    pub remote_dir: String,
    /// File-name prefix ahead of the embedded date
    pub file_prefix: String,
    /// Source name records from this feed are stored under
    pub source_name: String,
}

impl FeedSpec {
    /// File-name prefix matching one day's objects.
    pub fn daily_prefix(&self, date: NaiveDate) -> String {
        format!("{}{}", self.file_prefix, feed_date(date))
    }
}

/// Find the newest object for a feed on the given date.
///
/// Objects are ordered by last-modified descending; ties break toward the
/// lexically smaller key. A date with no objects yields `NoDataFound`,
/// except when the date is the current UTC day, which retries the previous
/// day once before giving up.
#[instrument(skip(store, feed), fields(dir = %feed.remote_dir, prefix = %feed.file_prefix))]
pub async fn find_latest_for_date(
    store: &RemoteStore,
    feed: &FeedSpec,
    date: NaiveDate,
) -> DmisResult<RemoteObjectRef> {
    let mut date = date;
    loop {
        let prefix = feed.daily_prefix(date);
        let mut matches: Vec<RemoteObjectRef> = store
            .list(&feed.remote_dir)
            .await?
            .into_iter()
            .filter(|object| object.file_name().starts_with(&prefix))
            .collect();

        if matches.is_empty() {
            if date == Utc::now().date_naive() {
                // Today's first file may not have landed yet.
                date = date.pred_opt().ok_or_else(|| {
                    DmisError::NoDataFound(format!("no previous day before {}", date))
                })?;
                continue;
            }
            return Err(DmisError::NoDataFound(format!(
                "no {} objects matching {}",
                feed.source_name, prefix
            )));
        }

        matches.sort_by(|a, b| {
            b.last_modified
                .cmp(&a.last_modified)
                .then_with(|| a.key.cmp(&b.key))
        });
        let newest = matches.remove(0);
        info!(key = %newest.key, candidates = matches.len() + 1, "Located feed object");
        return Ok(newest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn lightning_feed() -> FeedSpec {
        FeedSpec {
            remote_dir: "earthnetworks".to_string(),
            file_prefix: "pplnneedlx_".to_string(),
            source_name: "earthnetworks_lightning".to_string(),
        }
    }

    #[test]
    fn test_daily_prefix() {
        let feed = lightning_feed();
        let date = NaiveDate::from_ymd_opt(2017, 8, 8).unwrap();
        assert_eq!(feed.daily_prefix(date), "pplnneedlx_20170808");
    }

    #[tokio::test]
    async fn test_newest_upload_wins_for_past_date() {
        let store = RemoteStore::in_memory();
        store
            .put(
                "earthnetworks/pplnneedlx_20170808_191011.csv",
                Bytes::from_static(b"first"),
            )
            .await
            .unwrap();
        // Uploaded later, so it wins even though its embedded time is earlier.
        store
            .put(
                "earthnetworks/pplnneedlx_20170808_072225.csv",
                Bytes::from_static(b"second"),
            )
            .await
            .unwrap();

        let feed = lightning_feed();
        let date = NaiveDate::from_ymd_opt(2017, 8, 8).unwrap();
        let object = find_latest_for_date(&store, &feed, date).await.unwrap();
        assert_eq!(object.key, "earthnetworks/pplnneedlx_20170808_072225.csv");
    }

    #[tokio::test]
    async fn test_filter_is_filename_prefix_based() {
        let store = RemoteStore::in_memory();
        store
            .put(
                "earthnetworks/pplnneedlx_20170808_072225.csv",
                Bytes::from_static(b"lx"),
            )
            .await
            .unwrap();
        store
            .put(
                "earthnetworks/other_20170808_072225.csv",
                Bytes::from_static(b"other"),
            )
            .await
            .unwrap();

        let feed = lightning_feed();
        let date = NaiveDate::from_ymd_opt(2017, 8, 8).unwrap();
        let object = find_latest_for_date(&store, &feed, date).await.unwrap();
        assert_eq!(object.key, "earthnetworks/pplnneedlx_20170808_072225.csv");
    }

    #[tokio::test]
    async fn test_today_falls_back_to_yesterday() {
        let store = RemoteStore::in_memory();
        let today = Utc::now().date_naive();
        let yesterday = today.pred_opt().unwrap();
        let key = format!(
            "earthnetworks/pplnneedlx_{}_235959.csv",
            feed_date(yesterday)
        );
        store.put(&key, Bytes::from_static(b"y")).await.unwrap();

        let feed = lightning_feed();
        let object = find_latest_for_date(&store, &feed, today).await.unwrap();
        assert_eq!(object.key, key);
    }

    #[tokio::test]
    async fn test_past_date_with_no_objects_is_no_data() {
        let store = RemoteStore::in_memory();
        store
            .put(
                "earthnetworks/pplnneedlx_20170808_072225.csv",
                Bytes::from_static(b"lx"),
            )
            .await
            .unwrap();

        let feed = lightning_feed();
        let date = NaiveDate::from_ymd_opt(2017, 8, 9).unwrap();
        let result = find_latest_for_date(&store, &feed, date).await;
        assert!(matches!(result, Err(DmisError::NoDataFound(_))));
    }

    #[tokio::test]
    async fn test_empty_store_today_is_no_data_after_one_hop() {
        let store = RemoteStore::in_memory();
        let feed = lightning_feed();
        let result = find_latest_for_date(&store, &feed, Utc::now().date_naive()).await;
        assert!(matches!(result, Err(DmisError::NoDataFound(_))));
    }
}
