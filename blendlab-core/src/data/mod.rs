//! Price feeds and evaluation windows.
//!
//! Parsing raw files is the runner's job; this module only validates bars
//! and derives the return series.

pub mod feed;

pub use feed::{PriceFeed, PriceWindow, MIN_WINDOW_BARS};

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::domain::SeriesError;

/// Structured errors for price-feed validation.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no bars for instrument '{instrument}'")]
    Empty { instrument: String },

    #[error("bars for '{instrument}' are not strictly increasing in time at {time}")]
    Unordered {
        instrument: String,
        time: DateTime<Utc>,
    },

    #[error("invalid price {price} for '{instrument}' at {time}")]
    InvalidPrice {
        instrument: String,
        time: DateTime<Utc>,
        price: f64,
    },

    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("window for '{instrument}' has {bars} bars, at least {required} are required")]
    InsufficientBars {
        instrument: String,
        bars: usize,
        required: usize,
    },

    #[error(transparent)]
    Series(#[from] SeriesError),
}
