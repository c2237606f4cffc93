//! Price-feed loading for the runner.
//!
//! Reads a CSV whose first column (or a column named `time`) holds bar
//! timestamps and whose other columns hold one close series per instrument.
//! Synthetic feeds are a developer-only debug mode; they are tagged so they
//! cannot be mistaken for real data in exported results.

use std::io::Read;
use std::path::{Path, PathBuf};

use blendlab_core::data::{DataError, PriceFeed};
use blendlab_core::domain::Bar;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{info, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("no column '{instrument}' in price data (available: {available})")]
    UnknownInstrument {
        instrument: String,
        available: String,
    },

    #[error("row {row}: cannot parse timestamp '{value}'")]
    BadTimestamp { row: usize, value: String },

    #[error("row {row}: cannot parse price '{value}'")]
    BadPrice { row: usize, value: String },

    #[error("synthetic feed needs a positive bar interval, got {0} minutes")]
    BadInterval(u32),

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// A loaded feed plus its provenance.
#[derive(Debug, Clone)]
pub struct LoadedFeed {
    pub feed: PriceFeed,
    /// Rows with no price for the instrument.
    pub skipped_rows: usize,
    /// BLAKE3 over the instrument's bars.
    pub dataset_hash: String,
    pub synthetic: bool,
}

/// Load one instrument's closes from a CSV file.
pub fn load_price_feed(path: &Path, instrument: &str) -> Result<LoadedFeed, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = read_price_feed(file, instrument)?;
    info!(
        path = %path.display(),
        instrument,
        bars = loaded.feed.len(),
        skipped = loaded.skipped_rows,
        hash = %loaded.dataset_hash,
        "loaded price feed"
    );
    Ok(loaded)
}

/// Parse CSV from any reader. See [`load_price_feed`].
pub fn read_price_feed<R: Read>(reader: R, instrument: &str) -> Result<LoadedFeed, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let time_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("time"))
        .unwrap_or(0);
    let price_col = headers
        .iter()
        .position(|h| h == instrument)
        .filter(|&i| i != time_col)
        .ok_or_else(|| LoadError::UnknownInstrument {
            instrument: instrument.to_string(),
            available: headers
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != time_col)
                .map(|(_, h)| h)
                .collect::<Vec<_>>()
                .join(", "),
        })?;

    let mut bars = Vec::new();
    let mut skipped_rows = 0;
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // Header is line 1.
        let row = i + 2;
        let price = record.get(price_col).unwrap_or("");
        if price.is_empty() || price.eq_ignore_ascii_case("nan") {
            skipped_rows += 1;
            continue;
        }
        let time_raw = record.get(time_col).unwrap_or("");
        let time = parse_timestamp(time_raw).ok_or_else(|| LoadError::BadTimestamp {
            row,
            value: time_raw.to_string(),
        })?;
        let close: f64 = price.parse().map_err(|_| LoadError::BadPrice {
            row,
            value: price.to_string(),
        })?;
        bars.push(Bar::new(time, close));
    }

    if skipped_rows > 0 {
        warn!(instrument, skipped_rows, "rows without a price were skipped");
    }

    let feed = PriceFeed::new(instrument, bars)?;
    let dataset_hash = feed.dataset_hash();
    Ok(LoadedFeed {
        feed,
        skipped_rows,
        dataset_hash,
        synthetic: false,
    })
}

/// Accepts RFC 3339, `YYYY-mm-dd HH:MM:SS+hh:mm`, or a naive
/// `YYYY-mm-dd HH:MM:SS` taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|t| t.and_utc())
}

/// Generate a deterministic random-walk feed for testing/development.
///
/// One bar every `bar_minutes` from `start` 00:00 UTC through the end of
/// `end`, starting at 1.10 with small log-normal steps.
pub fn synthetic_feed(
    instrument: &str,
    start: NaiveDate,
    end: NaiveDate,
    bar_minutes: u32,
    seed: u64,
) -> Result<LoadedFeed, LoadError> {
    if bar_minutes == 0 {
        return Err(LoadError::BadInterval(bar_minutes));
    }
    warn!(instrument, %start, %end, "generating synthetic data, results will be tagged as synthetic");

    let mut rng = StdRng::seed_from_u64(seed);
    let step = Duration::minutes(i64::from(bar_minutes));
    let first = start.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
    let stop = end.succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0)).map(|t| t.and_utc());

    let mut bars = Vec::new();
    if let (Some(mut time), Some(stop)) = (first, stop) {
        let mut price = 1.10_f64;
        while time < stop {
            bars.push(Bar::new(time, price));
            let shock: f64 = rng.gen_range(-1.0..1.0);
            price *= (shock * 0.0008).exp();
            time += step;
        }
    }

    let feed = PriceFeed::new(instrument, bars)?;
    let dataset_hash = feed.dataset_hash();
    Ok(LoadedFeed {
        feed,
        skipped_rows: 0,
        dataset_hash,
        synthetic: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    const CSV: &str = "\
time,EURUSD,GBPUSD
2020-01-02 00:00:00,1.1210,1.3100
2020-01-02 00:20:00,1.1212,
2020-01-02 00:40:00,1.1209,1.3105
2020-01-02 01:00:00,,1.3107
2020-01-02 01:20:00,1.1215,1.3110
";

    #[test]
    fn reads_one_instrument_and_skips_gaps() {
        let loaded = read_price_feed(CSV.as_bytes(), "EURUSD").unwrap();
        assert_eq!(loaded.feed.len(), 4);
        assert_eq!(loaded.skipped_rows, 1);
        assert!(!loaded.synthetic);
        assert_eq!(loaded.feed.bars()[3].close, 1.1215);

        let gbp = read_price_feed(CSV.as_bytes(), "GBPUSD").unwrap();
        assert_eq!(gbp.feed.len(), 4);
        assert_ne!(gbp.dataset_hash, loaded.dataset_hash);
    }

    #[test]
    fn unknown_instrument_lists_columns() {
        let err = read_price_feed(CSV.as_bytes(), "USDJPY").unwrap_err();
        match err {
            LoadError::UnknownInstrument { available, .. } => {
                assert_eq!(available, "EURUSD, GBPUSD")
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_price_reports_row() {
        let csv = "time,EURUSD\n2020-01-02 00:00:00,1.1\n2020-01-02 00:20:00,abc\n";
        let err = read_price_feed(csv.as_bytes(), "EURUSD").unwrap_err();
        assert!(matches!(err, LoadError::BadPrice { row: 3, .. }));
    }

    #[test]
    fn unordered_rows_rejected() {
        let csv = "time,EURUSD\n2020-01-02 00:20:00,1.1\n2020-01-02 00:00:00,1.2\n";
        let err = read_price_feed(csv.as_bytes(), "EURUSD").unwrap_err();
        assert!(matches!(err, LoadError::Data(DataError::Unordered { .. })));
    }

    #[test]
    fn timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 1, 2, 5, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2020-01-02T05:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2020-01-02 00:00:00-05:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-01-02 05:00:00"), Some(expected));
        assert_eq!(parse_timestamp("02/01/2020"), None);
    }

    #[test]
    fn synthetic_is_deterministic_and_tagged() {
        let d = |day| NaiveDate::from_ymd_opt(2020, 1, day).unwrap();
        let a = synthetic_feed("EURUSD", d(1), d(2), 20, 7).unwrap();
        let b = synthetic_feed("EURUSD", d(1), d(2), 20, 7).unwrap();
        assert!(a.synthetic);
        assert_eq!(a.feed.len(), 144);
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_eq!(a.feed.bars()[3].time.minute(), 0);

        let c = synthetic_feed("EURUSD", d(1), d(2), 20, 8).unwrap();
        assert_ne!(a.dataset_hash, c.dataset_hash);
    }

    #[test]
    fn synthetic_rejects_zero_interval() {
        let d = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert!(matches!(
            synthetic_feed("X", d, d, 0, 1),
            Err(LoadError::BadInterval(0))
        ));
    }
}
