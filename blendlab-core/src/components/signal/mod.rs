//! Signal sources: turn a price window into a position per bar.
//!
//! Sources see only closes at or before the bar they decide. They are flat
//! until their indicators have warmed up, and know nothing about costs,
//! sessions or other sources. Warmup rows carry no signal: they are kept in
//! the position series for alignment but never evaluated.

pub mod ma_crossover;
pub mod mean_reversion;

pub use ma_crossover::SmaCrossover;
pub use mean_reversion::MeanReversion;

use thiserror::Error;

use crate::data::PriceWindow;
use crate::domain::{Bar, Position, PositionSeries, ReturnSeries, SeriesError};
use crate::engine::{BacktestEvaluator, EvalError, Evaluation};

/// Failures while building or running a source.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("invalid {source_name} parameters: {reason}")]
    InvalidParameters {
        source_name: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Evaluation(#[from] EvalError),
}

/// Trait for position sources.
///
/// # Architecture invariant
/// `positions` must return exactly one position per input bar, and the
/// position at bar t may depend only on `bars[0..=t]`.
pub trait SignalSource: Send + Sync {
    /// Human-readable name (e.g., "sma_crossover").
    fn name(&self) -> &str;

    /// Number of leading bars that are always flat. The first real
    /// signal is at bar `warmup_bars()`.
    fn warmup_bars(&self) -> usize;

    fn positions(&self, bars: &[Bar]) -> Vec<Position>;
}

/// A source's positions over a window, evaluated on their own.
#[derive(Debug, Clone)]
pub struct SourceResults {
    pub name: String,
    /// The window's full return series.
    pub returns: ReturnSeries,
    /// One position per return row, warmup rows included (flat).
    pub positions: PositionSeries,
    /// First return row carrying a real signal.
    pub first_valid: usize,
    /// Standalone backtest over the rows from `first_valid` on.
    pub evaluation: Evaluation,
}

/// Run `source` over `window` and evaluate it standalone.
///
/// Positions are computed over every bar of the window and then aligned to
/// the window's return index, which starts at the second bar. Return row `i`
/// is bar `i + 1`, so a source warming up over `w` bars first signals at
/// row `w - 1` (row 0 when `w == 0`).
pub fn run_source(
    source: &dyn SignalSource,
    window: &PriceWindow,
    evaluator: &BacktestEvaluator,
) -> Result<SourceResults, SourceError> {
    let bars = window.bars();
    let all = source.positions(bars);
    if all.len() != bars.len() {
        return Err(SeriesError::LengthMismatch {
            what: "source positions",
            len: all.len(),
            index_len: bars.len(),
        }
        .into());
    }

    let positions = PositionSeries::new(window.index().clone(), all[1..].to_vec())?;
    let first_valid = source.warmup_bars().saturating_sub(1).min(positions.len());
    let evaluation = evaluator.evaluate(
        &positions.skip(first_valid),
        &window.returns().skip(first_valid),
    )?;
    Ok(SourceResults {
        name: source.name().to_string(),
        returns: window.returns().clone(),
        positions,
        first_valid,
        evaluation,
    })
}

pub(crate) fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    struct AlwaysLong;

    impl SignalSource for AlwaysLong {
        fn name(&self) -> &str {
            "always_long"
        }
        fn warmup_bars(&self) -> usize {
            0
        }
        fn positions(&self, bars: &[Bar]) -> Vec<Position> {
            vec![Position::Long; bars.len()]
        }
    }

    struct Truncating;

    impl SignalSource for Truncating {
        fn name(&self) -> &str {
            "truncating"
        }
        fn warmup_bars(&self) -> usize {
            0
        }
        fn positions(&self, bars: &[Bar]) -> Vec<Position> {
            vec![Position::Long; bars.len() - 1]
        }
    }

    #[test]
    fn aligns_to_return_index() {
        let window = PriceWindow::new("TEST", make_bars(&[100.0, 101.0, 99.0, 102.0])).unwrap();
        let res = run_source(&AlwaysLong, &window, &BacktestEvaluator::frictionless()).unwrap();
        assert_eq!(res.name, "always_long");
        assert_eq!(res.positions.len(), 3);
        assert_eq!(res.first_valid, 0);
        assert!(res.positions.index().same_as(window.index()));
        // Long throughout: strategy equals the market after the lag row.
        let ev = &res.evaluation;
        assert!((ev.final_multiple() - ev.market_multiple()).abs() < 1e-12);
    }

    struct SlowStart;

    impl SignalSource for SlowStart {
        fn name(&self) -> &str {
            "slow_start"
        }
        fn warmup_bars(&self) -> usize {
            3
        }
        fn positions(&self, bars: &[Bar]) -> Vec<Position> {
            (0..bars.len())
                .map(|i| if i < 3 { Position::Flat } else { Position::Long })
                .collect()
        }
    }

    #[test]
    fn standalone_evaluation_starts_after_warmup() {
        let window =
            PriceWindow::new("TEST", make_bars(&[100.0, 90.0, 80.0, 81.0, 82.0, 83.0])).unwrap();
        let res = run_source(&SlowStart, &window, &BacktestEvaluator::frictionless()).unwrap();
        // Bar 3 is return row 2.
        assert_eq!(res.first_valid, 2);
        assert_eq!(res.positions.len(), 5);
        assert_eq!(res.evaluation.index().first(), window.index().get(3));
        assert_eq!(res.evaluation.len(), 2);
        // Long from bar 3: earns bars 4 and 5 only.
        let expected = (83.0_f64 / 81.0).ln().exp();
        assert!((res.evaluation.final_multiple() - expected).abs() < 1e-12);
        assert!((res.evaluation.market_multiple() - expected).abs() < 1e-12);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let window = PriceWindow::new("TEST", make_bars(&[100.0, 101.0, 99.0])).unwrap();
        let err = run_source(&Truncating, &window, &BacktestEvaluator::frictionless()).unwrap_err();
        assert!(matches!(
            err,
            SourceError::Series(SeriesError::LengthMismatch { .. })
        ));
    }
}
