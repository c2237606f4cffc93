//! Cost-adjusted backtest of a position series against log-returns.
//!
//! The position decided at bar t-1 earns the return of bar t. Any change of
//! position at bar t is charged `|pos[t] - pos[t-1]| * cost_rate` in log
//! space on that same bar. Bar 0 only seeds the lag and is dropped from the
//! evaluated result.

use crate::components::filter::FilteredPositions;
use crate::domain::{ensure_aligned, Position, PositionSeries, ReturnSeries, SeriesError, TimeIndex};
use thiserror::Error;

use super::diagnostics::{PositionCounts, TradeCounts};

/// Failures of a single evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("cost rate must be finite and non-negative, got {0}")]
    InvalidCostRate(f64),

    #[error("nothing to evaluate: {rows} row(s) remain after dropping the lag row")]
    EmptyResult { rows: usize },

    #[error("session filter leaves no active bar in the window")]
    NoActiveSession,
}

/// Proportional transaction cost applied per unit of position change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestEvaluator {
    cost_rate: f64,
}

impl BacktestEvaluator {
    pub fn new(cost_rate: f64) -> Result<Self, EvalError> {
        if !cost_rate.is_finite() || cost_rate < 0.0 {
            return Err(EvalError::InvalidCostRate(cost_rate));
        }
        Ok(Self { cost_rate })
    }

    /// Evaluator without transaction costs.
    pub fn frictionless() -> Self {
        Self { cost_rate: 0.0 }
    }

    pub fn cost_rate(&self) -> f64 {
        self.cost_rate
    }

    /// Evaluate `positions` against `returns`. Both must share one index.
    pub fn evaluate(
        &self,
        positions: &PositionSeries,
        returns: &ReturnSeries,
    ) -> Result<Evaluation, EvalError> {
        ensure_aligned(positions.index(), "positions", returns.index(), "returns")?;

        let pos = positions.values();
        let ret = returns.values();
        let n = pos.len();
        if n < 2 {
            return Err(EvalError::EmptyResult {
                rows: n.saturating_sub(1),
            });
        }

        let rows = n - 1;
        let mut kept_returns = Vec::with_capacity(rows);
        let mut strategy = Vec::with_capacity(rows);
        let mut trades = Vec::with_capacity(rows);
        for t in 1..n {
            let trade = pos[t].change_from(pos[t - 1]);
            kept_returns.push(ret[t]);
            strategy.push(pos[t - 1].as_f64() * ret[t] - f64::from(trade) * self.cost_rate);
            trades.push(trade);
        }

        Ok(Evaluation {
            index: positions.index().skip(1),
            positions: pos[1..].to_vec(),
            creturns: cumulative_multiple(&kept_returns),
            cstrategy: cumulative_multiple(&strategy),
            returns: kept_returns,
            strategy,
            trades,
            cost_rate: self.cost_rate,
        })
    }

    /// Evaluate session-gated positions. A window without any in-session
    /// bar has nothing meaningful to score and is rejected.
    pub fn evaluate_filtered(
        &self,
        filtered: &FilteredPositions,
        returns: &ReturnSeries,
    ) -> Result<Evaluation, EvalError> {
        if filtered.active_bars() == 0 {
            return Err(EvalError::NoActiveSession);
        }
        self.evaluate(filtered.positions(), returns)
    }
}

/// `exp(cumsum(x))`: the growth multiple of one unit of capital.
pub fn cumulative_multiple(log_returns: &[f64]) -> Vec<f64> {
    let mut acc = 0.0;
    log_returns
        .iter()
        .map(|r| {
            acc += r;
            acc.exp()
        })
        .collect()
}

/// Per-bar results of one evaluation. Never empty.
#[derive(Debug, Clone)]
pub struct Evaluation {
    index: TimeIndex,
    positions: Vec<Position>,
    returns: Vec<f64>,
    strategy: Vec<f64>,
    trades: Vec<u8>,
    creturns: Vec<f64>,
    cstrategy: Vec<f64>,
    cost_rate: f64,
}

impl Evaluation {
    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Position held entering each evaluated bar's successor.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Market log-returns.
    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    /// Strategy log-returns after costs.
    pub fn strategy(&self) -> &[f64] {
        &self.strategy
    }

    /// Units traded at each bar (0, 1 or 2).
    pub fn trades(&self) -> &[u8] {
        &self.trades
    }

    /// Buy-and-hold growth multiple.
    pub fn creturns(&self) -> &[f64] {
        &self.creturns
    }

    /// Strategy growth multiple.
    pub fn cstrategy(&self) -> &[f64] {
        &self.cstrategy
    }

    pub fn cost_rate(&self) -> f64 {
        self.cost_rate
    }

    /// Terminal strategy multiple, the quantity the optimizer maximises.
    pub fn final_multiple(&self) -> f64 {
        self.cstrategy.last().copied().unwrap_or(1.0)
    }

    pub fn market_multiple(&self) -> f64 {
        self.creturns.last().copied().unwrap_or(1.0)
    }

    pub fn outperformance(&self) -> f64 {
        self.final_multiple() - self.market_multiple()
    }

    pub fn total_trades(&self) -> u64 {
        self.trades.iter().map(|&t| u64::from(t)).sum()
    }

    pub fn trade_counts(&self) -> TradeCounts {
        TradeCounts::tally(&self.trades)
    }

    pub fn position_counts(&self) -> PositionCounts {
        PositionCounts::tally(&self.positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars};
    use Position::{Flat, Long, Short};

    fn index(n: usize) -> TimeIndex {
        TimeIndex::new(make_bars(&vec![1.0; n]).iter().map(|b| b.time).collect()).unwrap()
    }

    fn series(idx: &TimeIndex, pos: &[Position], ret: &[f64]) -> (PositionSeries, ReturnSeries) {
        (
            PositionSeries::new(idx.clone(), pos.to_vec()).unwrap(),
            ReturnSeries::new(idx.clone(), ret.to_vec()).unwrap(),
        )
    }

    #[test]
    fn lagged_returns_and_costs() {
        let idx = index(5);
        let (p, r) = series(
            &idx,
            &[Flat, Long, Long, Short, Short],
            &[0.0, 0.01, -0.02, 0.03, 0.01],
        );
        let ev = BacktestEvaluator::new(0.0001).unwrap().evaluate(&p, &r).unwrap();

        let expected = [-0.0001, -0.02, 0.0298, -0.01];
        assert_eq!(ev.len(), 4);
        for (a, e) in ev.strategy().iter().zip(expected) {
            assert_approx(*a, e, 1e-12);
        }
        assert_eq!(ev.trades(), &[1, 0, 2, 0]);
        assert_eq!(ev.total_trades(), 3);
        assert_approx(ev.final_multiple(), (-0.0003f64).exp(), 1e-12);
        assert_approx(ev.market_multiple(), 0.03f64.exp(), 1e-12);
        assert_eq!(ev.index().first(), idx.get(1));
    }

    #[test]
    fn flat_positions_track_cash() {
        let idx = index(4);
        let (p, r) = series(&idx, &[Flat; 4], &[0.0, 0.05, -0.01, 0.02]);
        let ev = BacktestEvaluator::new(0.01).unwrap().evaluate(&p, &r).unwrap();
        assert!(ev.cstrategy().iter().all(|&c| c == 1.0));
        assert_eq!(ev.total_trades(), 0);
    }

    #[test]
    fn single_row_is_empty_result() {
        let idx = index(1);
        let (p, r) = series(&idx, &[Long], &[0.01]);
        let err = BacktestEvaluator::frictionless().evaluate(&p, &r).unwrap_err();
        assert_eq!(err, EvalError::EmptyResult { rows: 0 });
    }

    #[test]
    fn misaligned_inputs_rejected() {
        let idx = index(4);
        let other = idx.skip(1);
        let p = PositionSeries::new(other, vec![Flat; 3]).unwrap();
        let r = ReturnSeries::new(idx, vec![0.0; 4]).unwrap();
        let err = BacktestEvaluator::frictionless().evaluate(&p, &r).unwrap_err();
        assert!(matches!(err, EvalError::Series(SeriesError::Misaligned { .. })));
    }

    #[test]
    fn invalid_cost_rate() {
        assert!(BacktestEvaluator::new(-0.1).is_err());
        assert!(BacktestEvaluator::new(f64::NAN).is_err());
        assert!(BacktestEvaluator::new(0.0).is_ok());
    }

    #[test]
    fn cumulative_multiple_compounds() {
        let c = cumulative_multiple(&[0.1, 0.2]);
        assert_approx(c[0], 0.1f64.exp(), 1e-12);
        assert_approx(c[1], 0.3f64.exp(), 1e-12);
    }
}
