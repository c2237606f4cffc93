//! Parametric objective: parameter vector in, negated terminal growth out.
//!
//! Each call builds both sources fresh, runs them over the frozen window,
//! and pushes their positions through combine, session filter and evaluate.
//! The only thing shared between calls is the read-only price window.

use std::sync::Arc;

use blendlab_core::components::{
    run_source, CombinationMode, MeanReversion, SessionFilter, SignalCombiner, SmaCrossover,
    SourceError, SourceResults,
};
use blendlab_core::data::{DataError, PriceFeed, PriceWindow};
use blendlab_core::engine::{BacktestEvaluator, CombinationPipeline, PipelineError, PipelineOutput};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use crate::config::{CombinationConfig, ConfigError, InvalidParamPolicy};

/// Arity of the parameter vector.
pub const PARAM_COUNT: usize = 4;

#[derive(Debug, Error)]
pub enum ObjectiveError {
    #[error("expected {expected} parameters, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("parameter {index} is not finite: {value}")]
    NonFinite { index: usize, value: f64 },

    #[error("source rejected parameters: {0}")]
    Source(#[from] SourceError),

    #[error("pipeline failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl ObjectiveError {
    /// True when the vector itself is unusable, as opposed to the data or
    /// configuration being wrong.
    pub fn is_invalid_params(&self) -> bool {
        matches!(
            self,
            ObjectiveError::NonFinite { .. }
                | ObjectiveError::Source(SourceError::InvalidParameters { .. })
        )
    }
}

/// Source hyperparameters decoded from a parameter vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceParams {
    pub sma_short: usize,
    pub sma_long: usize,
    pub mr_window: usize,
    pub mr_deviation: f64,
}

impl SourceParams {
    /// Window parameters are truncated toward zero; the deviation stays real.
    pub fn from_vector(x: &[f64]) -> Result<Self, ObjectiveError> {
        if x.len() != PARAM_COUNT {
            return Err(ObjectiveError::Arity {
                expected: PARAM_COUNT,
                got: x.len(),
            });
        }
        if let Some(index) = x.iter().position(|v| !v.is_finite()) {
            return Err(ObjectiveError::NonFinite {
                index,
                value: x[index],
            });
        }
        Ok(Self {
            sma_short: window(x[0]),
            sma_long: window(x[1]),
            mr_window: window(x[2]),
            mr_deviation: x[3],
        })
    }

    pub fn to_vector(&self) -> [f64; PARAM_COUNT] {
        [
            self.sma_short as f64,
            self.sma_long as f64,
            self.mr_window as f64,
            self.mr_deviation,
        ]
    }
}

fn window(v: f64) -> usize {
    // Negative values saturate to 0, which the sources reject.
    v.trunc() as usize
}

/// Everything one objective call produced.
#[derive(Debug, Clone)]
pub struct CombinationRun {
    pub params: SourceParams,
    pub sources: Vec<SourceResults>,
    pub output: PipelineOutput,
}

impl CombinationRun {
    /// The scalar handed to the minimizer.
    pub fn objective(&self) -> f64 {
        -self.output.evaluation.final_multiple()
    }
}

/// The frozen evaluation context.
#[derive(Debug, Clone)]
pub struct Objective {
    window: Arc<PriceWindow>,
    evaluator: BacktestEvaluator,
    filter: SessionFilter,
    mode: CombinationMode,
    policy: InvalidParamPolicy,
    penalty: f64,
}

impl Objective {
    pub fn new(
        window: PriceWindow,
        evaluator: BacktestEvaluator,
        filter: SessionFilter,
        mode: CombinationMode,
    ) -> Self {
        Self {
            window: Arc::new(window),
            evaluator,
            filter,
            mode,
            policy: InvalidParamPolicy::Fail,
            penalty: 0.0,
        }
    }

    /// Score rejected vectors with `penalty` in [`Objective::score`].
    pub fn with_penalty(mut self, penalty: f64) -> Self {
        self.policy = InvalidParamPolicy::Penalty;
        self.penalty = penalty;
        self
    }

    /// Cut the configured window from `feed` and freeze the configuration.
    pub fn from_config(feed: &PriceFeed, config: &CombinationConfig) -> Result<Self, ObjectiveError> {
        let window = feed.window(config.instrument.start, config.instrument.end)?;
        let filter = config.session_filter().map_err(ConfigError::from)?;
        let evaluator = config.evaluator().map_err(ConfigError::from)?;
        let objective = Self::new(window, evaluator, filter, config.combination.mode);
        Ok(match config.combination.on_invalid_params {
            InvalidParamPolicy::Fail => objective,
            InvalidParamPolicy::Penalty => objective.with_penalty(config.combination.penalty),
        })
    }

    pub fn window(&self) -> &PriceWindow {
        &self.window
    }

    pub fn mode(&self) -> CombinationMode {
        self.mode
    }

    pub fn policy(&self) -> InvalidParamPolicy {
        self.policy
    }

    /// Run the full combination for one parameter vector.
    pub fn run(&self, x: &[f64]) -> Result<CombinationRun, ObjectiveError> {
        let params = SourceParams::from_vector(x)?;
        let sma = SmaCrossover::new(params.sma_short, params.sma_long)?;
        let mr = MeanReversion::new(params.mr_window, params.mr_deviation)?;

        let sources = vec![
            run_source(&sma, &self.window, &self.evaluator)?,
            run_source(&mr, &self.window, &self.evaluator)?,
        ];
        let pipeline = CombinationPipeline::new(
            SignalCombiner::from_mode(self.mode),
            self.filter,
            self.evaluator,
        );
        let output = pipeline.run(&sources)?;
        Ok(CombinationRun {
            params,
            sources,
            output,
        })
    }

    /// `-final_multiple` for `x`. Rejected parameters are errors.
    pub fn evaluate(&self, x: &[f64]) -> Result<f64, ObjectiveError> {
        let value = self.run(x)?.objective();
        trace!(?x, value, "objective");
        Ok(value)
    }

    /// Like [`Objective::evaluate`], but rejected parameters score the
    /// configured penalty instead of failing.
    pub fn evaluate_penalized(&self, x: &[f64]) -> Result<f64, ObjectiveError> {
        match self.evaluate(x) {
            Err(e) if e.is_invalid_params() => {
                trace!(?x, penalty = self.penalty, error = %e, "penalized");
                Ok(self.penalty)
            }
            other => other,
        }
    }

    /// Evaluate according to the configured invalid-parameter policy.
    pub fn score(&self, x: &[f64]) -> Result<f64, ObjectiveError> {
        match self.policy {
            InvalidParamPolicy::Fail => self.evaluate(x),
            InvalidParamPolicy::Penalty => self.evaluate_penalized(x),
        }
    }
}
