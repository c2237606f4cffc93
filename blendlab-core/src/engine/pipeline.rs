//! Combination pipeline: combine, gate by session, evaluate.

use thiserror::Error;

use crate::components::combiner::{CombineError, SignalCombiner};
use crate::components::filter::{FilteredPositions, SessionFilter};
use crate::components::signal::SourceResults;
use crate::domain::{ensure_aligned, PositionSeries, SeriesError};

use super::evaluator::{BacktestEvaluator, EvalError, Evaluation};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("combination failed: {0}")]
    Combine(#[from] CombineError),

    #[error("evaluation failed: {0}")]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Every intermediate of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub combined: PositionSeries,
    pub filtered: FilteredPositions,
    pub evaluation: Evaluation,
}

/// Combiner, session filter and evaluator wired in that order.
#[derive(Debug)]
pub struct CombinationPipeline {
    combiner: SignalCombiner,
    filter: SessionFilter,
    evaluator: BacktestEvaluator,
}

impl CombinationPipeline {
    pub fn new(combiner: SignalCombiner, filter: SessionFilter, evaluator: BacktestEvaluator) -> Self {
        Self {
            combiner,
            filter,
            evaluator,
        }
    }

    pub fn combiner(&self) -> &SignalCombiner {
        &self.combiner
    }

    pub fn filter(&self) -> &SessionFilter {
        &self.filter
    }

    pub fn evaluator(&self) -> &BacktestEvaluator {
        &self.evaluator
    }

    /// Run over sources that were all computed on the same window.
    ///
    /// Only rows where every source has a real signal are combined: the
    /// common range starts at the latest `first_valid` of all sources. The
    /// evaluator then drops the lag row of that range.
    pub fn run(&self, sources: &[SourceResults]) -> Result<PipelineOutput, PipelineError> {
        let Some(first) = sources.first() else {
            return Err(CombineError::TooFewSources { got: 0 }.into());
        };
        for other in &sources[1..] {
            ensure_aligned(
                first.returns.index(),
                "source returns",
                other.returns.index(),
                "source returns",
            )?;
        }

        let start = common_start(sources);
        let rows = first.returns.len().saturating_sub(start);
        if rows < 2 {
            return Err(EvalError::EmptyResult {
                rows: rows.saturating_sub(1),
            }
            .into());
        }

        let returns = first.returns.skip(start);
        let trimmed: Vec<PositionSeries> = sources.iter().map(|s| s.positions.skip(start)).collect();
        let series: Vec<&PositionSeries> = trimmed.iter().collect();
        let combined = self.combiner.combine(&series)?;
        let filtered = self.filter.apply(&combined);

        let evaluation = self.evaluator.evaluate_filtered(&filtered, &returns)?;
        Ok(PipelineOutput {
            combined,
            filtered,
            evaluation,
        })
    }
}

/// First return row at which every source carries a signal.
pub fn common_start(sources: &[SourceResults]) -> usize {
    sources.iter().map(|s| s.first_valid).max().unwrap_or(0)
}
