//! Time handling for vendor feed files.
//!
//! Feed objects are named `{prefix}_{YYYYMMDD}_{HHMMSS}.{ext}`; the embedded
//! timestamp is the authoritative "data updated" moment for a file.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{DmisError, DmisResult};

/// Format a feed date the way daily object names embed it (`YYYYMMDD`).
pub fn feed_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Extract the timestamp embedded in a feed file name.
///
/// The final two `_`-separated segments of the stem are the date and time,
/// e.g. `pplnneedlx_20170808_072225.csv` is 2017-08-08 07:22:25.
pub fn filename_timestamp(file_name: &str) -> DmisResult<NaiveDateTime> {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    let segments: Vec<&str> = stem.split('_').collect();
    if segments.len() < 2 {
        return Err(DmisError::MalformedRecord(format!(
            "no timestamp in file name: {}",
            file_name
        )));
    }
    let compact = format!(
        "{}{}",
        segments[segments.len() - 2],
        segments[segments.len() - 1]
    );
    NaiveDateTime::parse_from_str(&compact, "%Y%m%d%H%M%S").map_err(|e| {
        DmisError::MalformedRecord(format!("bad timestamp in file name {}: {}", file_name, e))
    })
}

/// Format a timestamp as the user-facing freshness label, e.g.
/// `08-Aug-2017 07:22:25`.
pub fn freshness_label(timestamp: NaiveDateTime) -> String {
    timestamp.format("%d-%b-%Y %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_feed_date_format() {
        let date = NaiveDate::from_ymd_opt(2017, 8, 8).unwrap();
        assert_eq!(feed_date(date), "20170808");
    }

    #[test]
    fn test_filename_timestamp_parse() {
        let ts = filename_timestamp("pplnneedlx_20170808_072225.csv").unwrap();
        assert_eq!(
            ts,
            NaiveDate::from_ymd_opt(2017, 8, 8)
                .unwrap()
                .and_hms_opt(7, 22, 25)
                .unwrap()
        );
    }

    #[test]
    fn test_filename_timestamp_rejects_missing_segments() {
        assert!(matches!(
            filename_timestamp("lightning.csv"),
            Err(DmisError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_filename_timestamp_rejects_non_numeric() {
        assert!(matches!(
            filename_timestamp("pplnneedlx_2017aug8_072225.csv"),
            Err(DmisError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_freshness_label_format() {
        let ts = NaiveDate::from_ymd_opt(2017, 8, 8)
            .unwrap()
            .and_hms_opt(7, 22, 25)
            .unwrap();
        assert_eq!(freshness_label(ts), "08-Aug-2017 07:22:25");
    }

    #[test]
    fn test_label_round_trip_from_filename() {
        let ts = filename_timestamp("pplnneedlx_20171102_120000.csv").unwrap();
        assert_eq!(freshness_label(ts), "02-Nov-2017 12:00:00");
    }
}
