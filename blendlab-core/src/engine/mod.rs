//! Evaluation engine: vectorised cost-adjusted backtest and the pipeline
//! that feeds it combined, session-gated positions.

pub mod diagnostics;
pub mod evaluator;
pub mod pipeline;

pub use diagnostics::{PositionCounts, TradeCounts};
pub use evaluator::{cumulative_multiple, BacktestEvaluator, EvalError, Evaluation};
pub use pipeline::{common_start, CombinationPipeline, PipelineError, PipelineOutput};
