//! Derivative-free bounded minimizers.
//!
//! The objective is non-smooth (window parameters are truncated to whole
//! bars), so both methods rely on function values only and remember the best
//! point ever evaluated rather than trusting the last one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{OptimizerConfig, OptimizerMethod};
use crate::objective::ObjectiveError;

/// Golden ratio conjugate, `(sqrt(5) - 1) / 2`.
const INV_PHI: f64 = 0.618_033_988_749_894_9;
const MAX_LINE_STEPS: usize = 60;

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("start point has {got} coordinates, bounds have {expected}")]
    Dimension { expected: usize, got: usize },

    #[error("bound {index} is invalid: [{lo}, {hi}]")]
    InvalidBounds { index: usize, lo: f64, hi: f64 },

    #[error("start coordinate {index} = {value} lies outside its bounds")]
    StartOutOfBounds { index: usize, value: f64 },

    #[error(transparent)]
    Objective(#[from] ObjectiveError),
}

/// One inclusive `[lo, hi]` box per parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamBounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl ParamBounds {
    pub fn new(bounds: &[[f64; 2]]) -> Result<Self, OptimizeError> {
        for (index, &[lo, hi]) in bounds.iter().enumerate() {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(OptimizeError::InvalidBounds { index, lo, hi });
            }
        }
        Ok(Self {
            lower: bounds.iter().map(|b| b[0]).collect(),
            upper: bounds.iter().map(|b| b[1]).collect(),
        })
    }

    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dim()
            && x.iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(v, (lo, hi))| (*lo..=*hi).contains(v))
    }

    pub fn clamp(&self, x: &mut [f64]) {
        for (v, (lo, hi)) in x.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
            *v = v.clamp(*lo, *hi);
        }
    }

    /// Range of `t` keeping `x + t * d` inside the box.
    fn step_range(&self, x: &[f64], d: &[f64]) -> (f64, f64) {
        let mut t_lo = f64::NEG_INFINITY;
        let mut t_hi = f64::INFINITY;
        for j in 0..x.len() {
            if d[j].abs() < 1e-15 {
                continue;
            }
            let a = (self.lower[j] - x[j]) / d[j];
            let b = (self.upper[j] - x[j]) / d[j];
            t_lo = t_lo.max(a.min(b));
            t_hi = t_hi.min(a.max(b));
        }
        if t_lo > t_hi || !t_lo.is_finite() || !t_hi.is_finite() {
            (0.0, 0.0)
        } else {
            (t_lo.min(0.0), t_hi.max(0.0))
        }
    }

    fn check_start(&self, x0: &[f64]) -> Result<(), OptimizeError> {
        if x0.len() != self.dim() {
            return Err(OptimizeError::Dimension {
                expected: self.dim(),
                got: x0.len(),
            });
        }
        for (index, &value) in x0.iter().enumerate() {
            if !(self.lower[index]..=self.upper[index]).contains(&value) {
                return Err(OptimizeError::StartOutOfBounds { index, value });
            }
        }
        Ok(())
    }
}

/// Best point found by a minimizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub evaluations: usize,
    pub iterations: usize,
    pub converged: bool,
}

/// Objective as seen by a minimizer.
pub type ObjectiveFn<'a> = dyn FnMut(&[f64]) -> Result<f64, ObjectiveError> + 'a;

/// Trait for black-box bounded minimizers.
pub trait Minimizer: Send + Sync {
    /// Human-readable name (e.g., "powell").
    fn name(&self) -> &str;

    /// Minimize `f` over `bounds` starting from `x0`, which must lie inside
    /// the bounds. Every evaluated point lies inside the bounds.
    fn minimize(
        &self,
        f: &mut ObjectiveFn<'_>,
        bounds: &ParamBounds,
        x0: &[f64],
    ) -> Result<Minimum, OptimizeError>;
}

/// Build the minimizer selected in the configuration.
pub fn minimizer_for(config: &OptimizerConfig) -> Box<dyn Minimizer> {
    match config.method {
        OptimizerMethod::Powell => Box::new(Powell {
            max_iterations: config.max_iterations,
            xtol: config.xtol,
            ftol: config.ftol,
        }),
        OptimizerMethod::Random => Box::new(RandomSearch {
            samples: config.samples,
            seed: config.seed,
        }),
    }
}

/// Counts evaluations and remembers the best point seen.
struct Tracker<'f, 'a> {
    f: &'f mut ObjectiveFn<'a>,
    evaluations: usize,
    best_x: Vec<f64>,
    best_value: f64,
}

impl<'f, 'a> Tracker<'f, 'a> {
    fn new(f: &'f mut ObjectiveFn<'a>) -> Self {
        Self {
            f,
            evaluations: 0,
            best_x: Vec::new(),
            best_value: f64::INFINITY,
        }
    }

    /// NaN scores as +inf so it never wins a comparison.
    fn eval(&mut self, x: &[f64]) -> Result<f64, OptimizeError> {
        let raw = (self.f)(x)?;
        self.evaluations += 1;
        let value = if raw.is_nan() { f64::INFINITY } else { raw };
        if value < self.best_value || self.best_x.is_empty() {
            self.best_value = value;
            self.best_x = x.to_vec();
        }
        Ok(value)
    }

    fn finish(self, iterations: usize, converged: bool) -> Minimum {
        Minimum {
            x: self.best_x,
            value: self.best_value,
            evaluations: self.evaluations,
            iterations,
            converged,
        }
    }
}

/// Powell's conjugate direction method with box-constrained golden-section
/// line searches.
#[derive(Debug, Clone)]
pub struct Powell {
    pub max_iterations: usize,
    /// Line searches stop once the bracket is shorter than this, in
    /// parameter units.
    pub xtol: f64,
    /// Stop when an iteration improves the objective by less than this,
    /// relative to its magnitude.
    pub ftol: f64,
}

impl Default for Powell {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            xtol: 1e-2,
            ftol: 1e-6,
        }
    }
}

impl Powell {
    /// Minimize along `d` from `x` (whose value is `fx`). Returns the step
    /// and value of the best point probed, `(0, fx)` if nothing beat it.
    fn line_search(
        &self,
        tracker: &mut Tracker<'_, '_>,
        bounds: &ParamBounds,
        x: &[f64],
        d: &[f64],
        fx: f64,
    ) -> Result<(f64, f64), OptimizeError> {
        let norm = d.iter().map(|v| v * v).sum::<f64>().sqrt();
        let (mut a, mut b) = bounds.step_range(x, d);
        if norm == 0.0 || (b - a) * norm <= self.xtol {
            return Ok((0.0, fx));
        }

        let point = |t: f64| step(x, d, t, bounds);

        let mut best = (0.0, fx);
        let mut c = b - INV_PHI * (b - a);
        let mut e = a + INV_PHI * (b - a);
        let mut fc = tracker.eval(&point(c))?;
        let mut fe = tracker.eval(&point(e))?;
        for (t, v) in [(c, fc), (e, fe)] {
            if v < best.1 {
                best = (t, v);
            }
        }

        for _ in 0..MAX_LINE_STEPS {
            if (b - a) * norm <= self.xtol {
                break;
            }
            if fc <= fe {
                b = e;
                e = c;
                fe = fc;
                c = b - INV_PHI * (b - a);
                fc = tracker.eval(&point(c))?;
                if fc < best.1 {
                    best = (c, fc);
                }
            } else {
                a = c;
                c = e;
                fc = fe;
                e = a + INV_PHI * (b - a);
                fe = tracker.eval(&point(e))?;
                if fe < best.1 {
                    best = (e, fe);
                }
            }
        }
        Ok(best)
    }
}

fn step(x: &[f64], d: &[f64], t: f64, bounds: &ParamBounds) -> Vec<f64> {
    let mut p: Vec<f64> = x.iter().zip(d).map(|(xi, di)| xi + t * di).collect();
    bounds.clamp(&mut p);
    p
}

impl Minimizer for Powell {
    fn name(&self) -> &str {
        "powell"
    }

    fn minimize(
        &self,
        f: &mut ObjectiveFn<'_>,
        bounds: &ParamBounds,
        x0: &[f64],
    ) -> Result<Minimum, OptimizeError> {
        bounds.check_start(x0)?;
        let n = bounds.dim();
        let mut tracker = Tracker::new(f);

        // Unit directions scaled to each parameter's range.
        let mut directions: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                let mut d = vec![0.0; n];
                d[i] = (bounds.upper[i] - bounds.lower[i]).max(1.0);
                d
            })
            .collect();

        let mut x = x0.to_vec();
        let mut fx = tracker.eval(&x)?;
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            iterations += 1;
            let x_start = x.clone();
            let f_start = fx;
            let mut biggest_drop = 0.0;
            let mut biggest_idx = 0;

            for (i, d) in directions.iter().enumerate() {
                let (t, f_new) = self.line_search(&mut tracker, bounds, &x, d, fx)?;
                if fx - f_new > biggest_drop {
                    biggest_drop = fx - f_new;
                    biggest_idx = i;
                }
                if t != 0.0 {
                    x = step(&x, d, t, bounds);
                    fx = f_new;
                }
            }

            debug!(iteration = iterations, value = fx, ?x, "powell iteration");

            if 2.0 * (f_start - fx) <= self.ftol * (f_start.abs() + fx.abs()) + 1e-20 {
                converged = true;
                break;
            }

            // Replace the direction of largest decrease with the net move,
            // when extrapolating along it still looks promising.
            let d_new: Vec<f64> = x.iter().zip(&x_start).map(|(a, b)| a - b).collect();
            let extrapolated = step(&x, &d_new, 1.0, bounds);
            let f_ext = tracker.eval(&extrapolated)?;
            if f_ext < f_start {
                let t = 2.0 * (f_start - 2.0 * fx + f_ext) * (f_start - fx - biggest_drop).powi(2)
                    - biggest_drop * (f_start - f_ext).powi(2);
                if t < 0.0 {
                    let (s, f_new) = self.line_search(&mut tracker, bounds, &x, &d_new, fx)?;
                    if s != 0.0 {
                        x = step(&x, &d_new, s, bounds);
                        fx = f_new;
                    }
                    directions[biggest_idx] = directions[n - 1].clone();
                    directions[n - 1] = d_new;
                }
            }
        }

        let result = tracker.finish(iterations, converged);
        debug!(
            value = result.value,
            evaluations = result.evaluations,
            converged = result.converged,
            "powell finished"
        );
        Ok(result)
    }
}

/// Seeded uniform sampling inside the bounds, plus the start point.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    pub samples: usize,
    pub seed: u64,
}

impl Minimizer for RandomSearch {
    fn name(&self) -> &str {
        "random"
    }

    fn minimize(
        &self,
        f: &mut ObjectiveFn<'_>,
        bounds: &ParamBounds,
        x0: &[f64],
    ) -> Result<Minimum, OptimizeError> {
        bounds.check_start(x0)?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut tracker = Tracker::new(f);
        tracker.eval(x0)?;

        let mut x = vec![0.0; bounds.dim()];
        for i in 0..self.samples {
            for (v, (lo, hi)) in x.iter_mut().zip(bounds.lower.iter().zip(&bounds.upper)) {
                *v = rng.gen_range(*lo..=*hi);
            }
            tracker.eval(&x)?;
            if (i + 1) % 50 == 0 {
                debug!(samples = i + 1, best = tracker.best_value, "random search");
            }
        }
        Ok(tracker.finish(self.samples, true))
    }
}
