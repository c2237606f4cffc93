//! Performance metrics — pure functions that compute strategy statistics.
//!
//! Every metric is a pure function of an evaluation's curves or returns.
//! No dependencies on the runner, data loading, or the optimizer.

use blendlab_core::engine::{Evaluation, PositionCounts, TradeCounts};
use serde::{Deserialize, Serialize};

/// Aggregate performance metrics for a single evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Terminal strategy growth multiple, net of costs.
    pub final_multiple: f64,
    /// Terminal buy-and-hold growth multiple.
    pub market_multiple: f64,
    pub outperformance: f64,
    pub total_return: f64,
    pub total_trades: u64,
    /// Mean over standard deviation of per-bar strategy log returns.
    pub sharpe_per_bar: f64,
    pub max_drawdown: f64,
    pub exposure: f64,
    pub bars: usize,
    pub positions: PositionCounts,
    pub trades: TradeCounts,
}

impl PerformanceMetrics {
    pub fn compute(evaluation: &Evaluation) -> Self {
        let positions = evaluation.position_counts();
        Self {
            final_multiple: evaluation.final_multiple(),
            market_multiple: evaluation.market_multiple(),
            outperformance: evaluation.outperformance(),
            total_return: evaluation.final_multiple() - 1.0,
            total_trades: evaluation.total_trades(),
            sharpe_per_bar: sharpe_ratio(evaluation.strategy()),
            max_drawdown: max_drawdown(evaluation.cstrategy()),
            exposure: positions.exposure(),
            bars: evaluation.len(),
            positions,
            trades: evaluation.trade_counts(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Per-bar Sharpe ratio of a return series (no annualisation, zero rate).
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(returns);
    let std = std_dev(returns);
    if std < 1e-15 {
        return 0.0;
    }
    mean / std
}

/// Largest peak-to-trough fall of a growth curve, as a negative fraction.
///
/// The curve is measured from an initial multiple of 1.0.
pub fn max_drawdown(curve: &[f64]) -> f64 {
    let mut peak = 1.0_f64;
    let mut max_dd = 0.0_f64;
    for &v in curve {
        if v > peak {
            peak = v;
        }
        let dd = (v - peak) / peak;
        if dd < max_dd {
            max_dd = dd;
        }
    }
    max_dd
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Sharpe ──

    #[test]
    fn sharpe_constant_returns_is_zero() {
        assert_eq!(sharpe_ratio(&[0.01, 0.01, 0.01]), 0.0);
    }

    #[test]
    fn sharpe_sign_follows_mean() {
        assert!(sharpe_ratio(&[0.01, 0.02, -0.005, 0.015]) > 0.0);
        assert!(sharpe_ratio(&[-0.01, -0.02, 0.005, -0.015]) < 0.0);
    }

    #[test]
    fn sharpe_short_series() {
        assert_eq!(sharpe_ratio(&[0.1]), 0.0);
        assert_eq!(sharpe_ratio(&[]), 0.0);
    }

    // ── Max drawdown ──

    #[test]
    fn drawdown_of_rising_curve_is_zero() {
        assert_eq!(max_drawdown(&[1.01, 1.02, 1.05]), 0.0);
    }

    #[test]
    fn drawdown_from_peak() {
        let dd = max_drawdown(&[1.1, 1.2, 0.9, 1.3, 1.17]);
        assert!((dd - (0.9 / 1.2 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn drawdown_below_starting_capital() {
        let dd = max_drawdown(&[0.95, 0.9]);
        assert!((dd + 0.1).abs() < 1e-12);
    }
}
