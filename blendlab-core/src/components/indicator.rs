//! Indicator trait.
//!
//! Indicators are pure functions: a close-price series in, a numeric series
//! of the same length out. Signal sources compute them once per run.

/// Trait for rolling indicators over close prices.
///
/// The first `lookback()` values are `f64::NAN` (warmup).
///
/// # Look-ahead contamination guard
/// No value at bar t may depend on prices from bar t+1 or later.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "sma_50", "stddev_75").
    fn name(&self) -> &str;

    /// Number of leading bars without a valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator over the whole close series.
    fn compute(&self, closes: &[f64]) -> Vec<f64>;
}
