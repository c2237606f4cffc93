//! Bollinger Bands — moving average +/- a multiple of the rolling deviation.
//!
//! - Middle: SMA(close, period)
//! - Upper: middle + multiplier * stddev(close, period)
//! - Lower: middle - multiplier * stddev(close, period)
//!
//! Sample stddev (see `RollingStd`). Lookback: period - 1.

use crate::components::indicator::Indicator;

use super::{RollingStd, Sma};

/// The three bands over a close series, all the same length as the input.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    pub middle: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct Bollinger {
    sma: Sma,
    std: RollingStd,
    multiplier: f64,
}

impl Bollinger {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Self {
            sma: Sma::new(period),
            std: RollingStd::new(period),
            multiplier,
        }
    }

    pub fn lookback(&self) -> usize {
        self.sma.lookback().max(self.std.lookback())
    }

    pub fn compute(&self, closes: &[f64]) -> BollingerBands {
        let middle = self.sma.compute(closes);
        let std = self.std.compute(closes);
        let upper = middle
            .iter()
            .zip(&std)
            .map(|(m, s)| m + self.multiplier * s)
            .collect();
        let lower = middle
            .iter()
            .zip(&std)
            .map(|(m, s)| m - self.multiplier * s)
            .collect();
        BollingerBands {
            middle,
            upper,
            lower,
        }
    }
}
