//! Concrete indicator implementations.
//!
//! `Sma` and `RollingStd` implement the `Indicator` trait; `Bollinger`
//! composes them into mean-reversion bands.

pub mod bollinger;
pub mod sma;
pub mod stddev;

pub use bollinger::{Bollinger, BollingerBands};
pub use sma::Sma;
pub use stddev::RollingStd;

/// Create bars from close prices for testing, spaced eight hours apart
/// starting 2024-01-02 00:00 UTC.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar::new(base + chrono::Duration::hours(8 * i as i64), close))
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
