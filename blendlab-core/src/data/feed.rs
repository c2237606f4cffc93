//! Price feed and evaluation window.
//!
//! A `PriceFeed` is the raw, read-only series for one instrument. A
//! `PriceWindow` freezes the slice between two calendar dates and derives the
//! log-return series every downstream stage is aligned to.

use chrono::NaiveDate;

use crate::domain::{Bar, ReturnSeries, TimeIndex};

use super::DataError;

/// Minimum bars in a window: two return rows, so at least one row survives
/// the one-bar lag of the evaluator.
pub const MIN_WINDOW_BARS: usize = 3;

/// Validated price history for one instrument.
#[derive(Debug, Clone)]
pub struct PriceFeed {
    instrument: String,
    bars: Vec<Bar>,
}

impl PriceFeed {
    /// Validate and wrap a bar series: non-empty, strictly increasing times,
    /// finite positive prices.
    pub fn new(instrument: impl Into<String>, bars: Vec<Bar>) -> Result<Self, DataError> {
        let instrument = instrument.into();
        if bars.is_empty() {
            return Err(DataError::Empty { instrument });
        }
        if let Some(i) = bars.windows(2).position(|w| w[1].time <= w[0].time) {
            return Err(DataError::Unordered {
                instrument,
                time: bars[i + 1].time,
            });
        }
        if let Some(bar) = bars.iter().find(|b| !b.is_sane()) {
            return Err(DataError::InvalidPrice {
                instrument,
                time: bar.time,
                price: bar.close,
            });
        }
        Ok(Self { instrument, bars })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bars whose UTC calendar date lies in `[start, end]`.
    pub fn window(&self, start: NaiveDate, end: NaiveDate) -> Result<PriceWindow, DataError> {
        if start > end {
            return Err(DataError::InvalidRange { start, end });
        }
        let bars: Vec<Bar> = self
            .bars
            .iter()
            .filter(|b| {
                let d = b.time.date_naive();
                d >= start && d <= end
            })
            .cloned()
            .collect();
        PriceWindow::new(self.instrument.clone(), bars)
    }

    /// Deterministic BLAKE3 hash over instrument, timestamps and prices.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.instrument.as_bytes());
        for bar in &self.bars {
            hasher.update(&bar.time.timestamp().to_le_bytes());
            hasher.update(&bar.close.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// A frozen evaluation window and its log-return series.
///
/// The return at bar t is `ln(close[t] / close[t-1])`; the first bar only
/// provides the reference price, so the return index starts at bar 1.
#[derive(Debug, Clone)]
pub struct PriceWindow {
    instrument: String,
    bars: Vec<Bar>,
    returns: ReturnSeries,
}

impl PriceWindow {
    pub fn new(instrument: impl Into<String>, bars: Vec<Bar>) -> Result<Self, DataError> {
        let instrument = instrument.into();
        if bars.len() < MIN_WINDOW_BARS {
            return Err(DataError::InsufficientBars {
                instrument,
                bars: bars.len(),
                required: MIN_WINDOW_BARS,
            });
        }
        let index = TimeIndex::new(bars.iter().skip(1).map(|b| b.time).collect())?;
        let values: Vec<f64> = bars
            .windows(2)
            .map(|w| (w[1].close / w[0].close).ln())
            .collect();
        let returns = ReturnSeries::new(index, values)?;
        Ok(Self {
            instrument,
            bars,
            returns,
        })
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// All bars in the window, including the leading reference bar.
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn returns(&self) -> &ReturnSeries {
        &self.returns
    }

    /// The index every derived series of this window is defined over.
    pub fn index(&self) -> &TimeIndex {
        self.returns.index()
    }
}
