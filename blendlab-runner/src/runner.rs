//! Study runner — wires together data loading, the objective, optimizers
//! and metrics.
//!
//! Entry points:
//! - `load_feed()`: resolves the configured CSV or a synthetic feed.
//! - `run_combination()`: evaluates one parameter vector.
//! - `optimize()`: runs the configured minimizer, then re-runs the best vector.
//! - `sweep()`: evaluates the configured grid in parallel.

use blendlab_core::components::CombinationMode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::{CombinationConfig, ConfigError, OptimizerConfig};
use crate::data_loader::{load_price_feed, synthetic_feed, LoadError, LoadedFeed};
use crate::metrics::PerformanceMetrics;
use crate::objective::{CombinationRun, Objective, ObjectiveError, SourceParams};
use crate::optimizer::{minimizer_for, Minimum, OptimizeError, ParamBounds};
use crate::sweep::{ParamGrid, ParamSweep, SweepResults};

/// Bar spacing of synthetic feeds.
pub const SYNTHETIC_BAR_MINUTES: u32 = 20;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("objective error: {0}")]
    Objective(#[from] ObjectiveError),
    #[error("optimizer error: {0}")]
    Optimize(#[from] OptimizeError),
    #[error("no price data configured for '{0}' (set instrument.data or use --synthetic)")]
    NoData(String),
}

/// One source's standalone performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSummary {
    pub name: String,
    pub final_multiple: f64,
    pub total_trades: u64,
}

/// Complete, serializable result of one evaluated parameter vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: String,
    pub instrument: String,
    pub start_date: String,
    pub end_date: String,
    pub dataset_hash: String,
    pub synthetic: bool,
    pub mode: CombinationMode,
    pub params: SourceParams,
    /// `-final_multiple`, the minimized quantity.
    pub objective: f64,
    pub metrics: PerformanceMetrics,
    pub sources: Vec<SourceSummary>,
    /// Present when the vector came out of an optimizer.
    pub optimization: Option<Minimum>,
}

fn default_schema_version() -> u32 {
    1
}

impl RunReport {
    fn build(
        config: &CombinationConfig,
        loaded: &LoadedFeed,
        run: &CombinationRun,
        optimization: Option<Minimum>,
    ) -> Result<Self, RunError> {
        Ok(Self {
            schema_version: SCHEMA_VERSION,
            run_id: config.run_id()?,
            instrument: config.instrument.symbol.clone(),
            start_date: config.instrument.start.to_string(),
            end_date: config.instrument.end.to_string(),
            dataset_hash: loaded.dataset_hash.clone(),
            synthetic: loaded.synthetic,
            mode: config.combination.mode,
            params: run.params,
            objective: run.objective(),
            metrics: PerformanceMetrics::compute(&run.output.evaluation),
            sources: run
                .sources
                .iter()
                .map(|s| SourceSummary {
                    name: s.name.clone(),
                    final_multiple: s.evaluation.final_multiple(),
                    total_trades: s.evaluation.total_trades(),
                })
                .collect(),
            optimization,
        })
    }
}

/// Load the configured CSV, or a synthetic feed when asked to.
pub fn load_feed(
    config: &CombinationConfig,
    synthetic: bool,
    seed: u64,
) -> Result<LoadedFeed, RunError> {
    let symbol = &config.instrument.symbol;
    if synthetic {
        return Ok(synthetic_feed(
            symbol,
            config.instrument.start,
            config.instrument.end,
            SYNTHETIC_BAR_MINUTES,
            seed,
        )?);
    }
    match &config.instrument.data {
        Some(path) => Ok(load_price_feed(path, symbol)?),
        None => Err(RunError::NoData(symbol.clone())),
    }
}

/// Evaluate one parameter vector and report it.
pub fn run_combination(
    config: &CombinationConfig,
    loaded: &LoadedFeed,
    params: &[f64],
) -> Result<(RunReport, CombinationRun), RunError> {
    let objective = Objective::from_config(&loaded.feed, config)?;
    let run = objective.run(params)?;
    info!(
        ?params,
        final_multiple = run.output.evaluation.final_multiple(),
        trades = run.output.evaluation.total_trades(),
        "combination evaluated"
    );
    let report = RunReport::build(config, loaded, &run, None)?;
    Ok((report, run))
}

/// Minimize the objective from the configured start point, then re-run the
/// best vector for a full report.
pub fn optimize(
    config: &CombinationConfig,
    optimizer: &OptimizerConfig,
    loaded: &LoadedFeed,
) -> Result<(RunReport, CombinationRun), RunError> {
    let objective = Objective::from_config(&loaded.feed, config)?;
    let bounds = ParamBounds::new(&config.params.bounds)?;
    let minimizer = minimizer_for(optimizer);
    info!(
        method = minimizer.name(),
        start = ?config.params.start,
        bars = objective.window().bars().len(),
        "optimizing"
    );

    let mut f = |x: &[f64]| objective.score(x);
    let minimum = minimizer.minimize(&mut f, &bounds, &config.params.start)?;
    info!(
        x = ?minimum.x,
        value = minimum.value,
        evaluations = minimum.evaluations,
        converged = minimum.converged,
        "optimization finished"
    );

    let run = objective.run(&minimum.x)?;
    let report = RunReport::build(config, loaded, &run, Some(minimum))?;
    Ok((report, run))
}

/// Evaluate the configured grid.
pub fn sweep(config: &CombinationConfig, loaded: &LoadedFeed) -> Result<SweepResults, RunError> {
    let objective = Objective::from_config(&loaded.feed, config)?;
    let grid = ParamGrid::from_config(&config.params, &config.sweep)?;
    Ok(ParamSweep::new().sweep(&objective, &grid)?)
}
