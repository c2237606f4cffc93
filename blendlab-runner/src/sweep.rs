//! Parameter sweep over a cartesian grid.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{ConfigError, ParamsConfig, SweepConfig};
use crate::objective::{Objective, ObjectiveError, SourceParams, PARAM_COUNT};

/// Largest grid a sweep will build.
pub const MAX_GRID_POINTS: usize = 1_000_000;

/// Cartesian parameter grid.
///
/// One axis per parameter, from its lower bound up to its upper bound in
/// fixed steps.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    axes: [Vec<f64>; PARAM_COUNT],
}

impl ParamGrid {
    pub fn new(axes: [Vec<f64>; PARAM_COUNT]) -> Self {
        Self { axes }
    }

    /// Build the grid from bounds and steps. Grids above
    /// [`MAX_GRID_POINTS`] are rejected before any axis is allocated.
    pub fn from_config(params: &ParamsConfig, sweep: &SweepConfig) -> Result<Self, ConfigError> {
        check_grid_size(params, sweep)?;
        let mut axes: [Vec<f64>; PARAM_COUNT] = Default::default();
        for (axis, ([lo, hi], step)) in axes.iter_mut().zip(params.bounds.iter().zip(sweep.steps)) {
            *axis = linspace_step(*lo, *hi, step);
        }
        Ok(Self { axes })
    }

    /// Number of points the configured grid would have, valid or not.
    pub fn planned_size(params: &ParamsConfig, sweep: &SweepConfig) -> f64 {
        params
            .bounds
            .iter()
            .zip(sweep.steps)
            .map(|([lo, hi], step)| axis_len(*lo, *hi, step))
            .product()
    }

    pub fn axes(&self) -> &[Vec<f64>; PARAM_COUNT] {
        &self.axes
    }

    /// Returns the total number of points in the grid, valid or not.
    pub fn size(&self) -> usize {
        self.axes.iter().map(Vec::len).product()
    }

    /// Generates all points in the grid, skipping those whose truncated
    /// short window is not below the long window.
    pub fn points(&self) -> Vec<[f64; PARAM_COUNT]> {
        let [a, b, c, d] = &self.axes;
        let mut points = Vec::new();
        for &short in a {
            for &long in b {
                // Skip invalid combinations (short >= long)
                if short.trunc() >= long.trunc() {
                    continue;
                }
                for &window in c {
                    for &dev in d {
                        points.push([short, long, window, dev]);
                    }
                }
            }
        }
        points
    }
}

/// Reject grids larger than [`MAX_GRID_POINTS`], or whose size is not a
/// finite number.
pub fn check_grid_size(params: &ParamsConfig, sweep: &SweepConfig) -> Result<(), ConfigError> {
    let planned = ParamGrid::planned_size(params, sweep);
    if planned.is_finite() && planned <= MAX_GRID_POINTS as f64 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "sweep grid would have {planned:.0} points, the limit is {MAX_GRID_POINTS}"
        )))
    }
}

fn axis_len(lo: f64, hi: f64, step: f64) -> f64 {
    ((hi - lo) / step + 1e-9).floor() + 1.0
}

fn linspace_step(lo: f64, hi: f64, step: f64) -> Vec<f64> {
    let count = axis_len(lo, hi, step) as usize;
    (0..count).map(|i| lo + i as f64 * step).collect()
}

/// One evaluated grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepEntry {
    pub params: SourceParams,
    pub objective: f64,
    pub final_multiple: f64,
    pub total_trades: u64,
}

/// Sweep results, best (lowest objective) first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResults {
    pub entries: Vec<SweepEntry>,
    /// Grid points dropped before evaluation.
    pub skipped: usize,
    /// Points a source rejected during evaluation.
    pub rejected: usize,
}

impl SweepResults {
    pub fn best(&self) -> Option<&SweepEntry> {
        self.entries.first()
    }

    pub fn top(&self, n: usize) -> &[SweepEntry] {
        &self.entries[..n.min(self.entries.len())]
    }
}

/// Parameter sweep executor.
///
/// Evaluates every point of a grid, optionally in parallel. Workers share
/// only the objective's read-only window.
#[derive(Debug, Clone)]
pub struct ParamSweep {
    parallel: bool,
}

impl Default for ParamSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl ParamSweep {
    pub fn new() -> Self {
        Self { parallel: true }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Executes the sweep. Data or configuration failures abort it;
    /// parameter rejections are counted and skipped.
    pub fn sweep(&self, objective: &Objective, grid: &ParamGrid) -> Result<SweepResults, ObjectiveError> {
        let points = grid.points();
        let skipped = grid.size() - points.len();
        info!(points = points.len(), skipped, parallel = self.parallel, "starting sweep");

        let eval = |x: &[f64; PARAM_COUNT]| -> Result<Option<SweepEntry>, ObjectiveError> {
            match objective.run(x) {
                Ok(run) => Ok(Some(SweepEntry {
                    params: run.params,
                    objective: run.objective(),
                    final_multiple: run.output.evaluation.final_multiple(),
                    total_trades: run.output.evaluation.total_trades(),
                })),
                Err(e) if e.is_invalid_params() => Ok(None),
                Err(e) => Err(e),
            }
        };

        let outcomes: Vec<Option<SweepEntry>> = if self.parallel {
            points.par_iter().map(eval).collect::<Result<_, _>>()?
        } else {
            points.iter().map(eval).collect::<Result<_, _>>()?
        };

        let rejected = outcomes.iter().filter(|o| o.is_none()).count();
        let mut entries: Vec<SweepEntry> = outcomes.into_iter().flatten().collect();
        entries.sort_by(|a, b| a.objective.total_cmp(&b.objective));

        if let Some(best) = entries.first() {
            info!(
                evaluated = entries.len(),
                rejected,
                best_objective = best.objective,
                "sweep finished"
            );
        }
        Ok(SweepResults {
            entries,
            skipped,
            rejected,
        })
    }
}
