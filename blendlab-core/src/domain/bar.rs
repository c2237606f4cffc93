//! Bar — the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One closing price for a single instrument at an absolute instant.
///
/// The feed is intraday (e.g. 20-minute bars), so bars carry a UTC
/// timestamp rather than a calendar date. Local session hours are derived
/// from it on demand by the session filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub time: DateTime<Utc>,
    pub close: f64,
}

impl Bar {
    pub fn new(time: DateTime<Utc>, close: f64) -> Self {
        Self { time, close }
    }

    /// Returns true if the price is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.close.is_nan()
    }

    /// A bar is sane when its price is finite and strictly positive,
    /// which is what a log-return needs.
    pub fn is_sane(&self) -> bool {
        !self.is_void() && self.close.is_finite() && self.close > 0.0
    }
}
