//! Serializable combination-study configuration.
//!
//! One immutable record loaded from TOML. Every component is built from it,
//! so a run is reproducible from the file alone.

use std::path::{Path, PathBuf};

use blendlab_core::components::{CombinationMode, FilterError, SessionFilter};
use blendlab_core::engine::{BacktestEvaluator, EvalError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::objective::PARAM_COUNT;

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid session: {0}")]
    Session(#[from] FilterError),

    #[error("invalid cost rate: {0}")]
    Cost(#[from] EvalError),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Full configuration of a combination study.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CombinationConfig {
    pub instrument: InstrumentConfig,
    pub session: SessionConfig,
    pub costs: CostConfig,
    pub combination: CombinationSettings,
    pub params: ParamsConfig,
    pub optimizer: OptimizerConfig,
    pub sweep: SweepConfig,
}

/// Which series to trade and over which dates (inclusive, UTC).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct InstrumentConfig {
    pub symbol: String,
    /// CSV with a time column and one close column per instrument.
    pub data: Option<PathBuf>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            symbol: "EURUSD".into(),
            data: None,
            start: NaiveDate::from_ymd_opt(2019, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2020, 8, 30).unwrap_or_default(),
        }
    }
}

/// Local trading hours, inclusive on both ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub timezone: String,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timezone: "America/New_York".into(),
            start_hour: 2,
            end_hour: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CostConfig {
    /// Fraction charged per unit of position change.
    pub rate: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self { rate: 0.000059 }
    }
}

/// What the objective does when a source rejects its parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidParamPolicy {
    /// Surface the error and stop the optimization.
    #[default]
    Fail,
    /// Score the vector with `combination.penalty` instead.
    Penalty,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CombinationSettings {
    pub mode: CombinationMode,
    pub on_invalid_params: InvalidParamPolicy,
    pub penalty: f64,
}

impl Default for CombinationSettings {
    fn default() -> Self {
        Self {
            mode: CombinationMode::Majority,
            on_invalid_params: InvalidParamPolicy::Fail,
            penalty: 1.0e6,
        }
    }
}

/// Parameter vector `[sma_short, sma_long, mr_window, mr_deviation]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ParamsConfig {
    pub start: [f64; PARAM_COUNT],
    /// Inclusive `[low, high]` per parameter.
    pub bounds: [[f64; 2]; PARAM_COUNT],
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            start: [50.0, 150.0, 75.0, 3.0],
            bounds: [[25.0, 75.0], [100.0, 200.0], [50.0, 100.0], [1.0, 5.0]],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerMethod {
    #[default]
    Powell,
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    pub method: OptimizerMethod,
    /// Outer iterations for Powell.
    pub max_iterations: usize,
    /// Line-search tolerance, in parameter units.
    pub xtol: f64,
    /// Relative objective improvement below which Powell stops.
    pub ftol: f64,
    pub seed: u64,
    /// Evaluations for random search.
    pub samples: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            method: OptimizerMethod::Powell,
            max_iterations: 20,
            xtol: 1e-2,
            ftol: 1e-6,
            seed: 42,
            samples: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    /// Grid step per parameter.
    pub steps: [f64; PARAM_COUNT],
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            steps: [25.0, 50.0, 25.0, 2.0],
        }
    }
}

impl CombinationConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML file. A relative `instrument.data` path is
    /// resolved against the config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let (Some(data), Some(dir)) = (config.instrument.data.as_mut(), path.parent()) {
            if data.is_relative() {
                *data = dir.join(&*data);
            }
        }
        Ok(config)
    }

    /// Everything that can be checked without price data, including the
    /// timezone name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instrument.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("instrument.symbol is empty".into()));
        }
        if self.instrument.start > self.instrument.end {
            return Err(ConfigError::Invalid(format!(
                "instrument.start {} is after instrument.end {}",
                self.instrument.start, self.instrument.end
            )));
        }
        self.session_filter()?;
        self.evaluator()?;

        let penalty = self.combination.penalty;
        if !penalty.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "combination.penalty must be finite, got {penalty}"
            )));
        }

        for (i, ([lo, hi], x)) in self.params.bounds.iter().zip(self.params.start).enumerate() {
            if !lo.is_finite() || !hi.is_finite() || lo > hi {
                return Err(ConfigError::Invalid(format!(
                    "params.bounds[{i}] = [{lo}, {hi}] is not a valid range"
                )));
            }
            if !(*lo..=*hi).contains(&x) {
                return Err(ConfigError::Invalid(format!(
                    "params.start[{i}] = {x} lies outside [{lo}, {hi}]"
                )));
            }
        }
        if let Some(i) = self.sweep.steps.iter().position(|s| !(s.is_finite() && *s > 0.0)) {
            return Err(ConfigError::Invalid(format!(
                "sweep.steps[{i}] must be positive"
            )));
        }
        crate::sweep::check_grid_size(&self.params, &self.sweep)?;

        let opt = &self.optimizer;
        if opt.max_iterations == 0 || opt.samples == 0 {
            return Err(ConfigError::Invalid(
                "optimizer.max_iterations and optimizer.samples must be at least 1".into(),
            ));
        }
        if !(opt.xtol > 0.0 && opt.ftol > 0.0) {
            return Err(ConfigError::Invalid(
                "optimizer tolerances must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn session_filter(&self) -> Result<SessionFilter, FilterError> {
        SessionFilter::new(
            &self.session.timezone,
            self.session.start_hour,
            self.session.end_hour,
        )
    }

    pub fn evaluator(&self) -> Result<BacktestEvaluator, EvalError> {
        BacktestEvaluator::new(self.costs.rate)
    }

    /// Deterministic hash ID for this configuration.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = CombinationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.instrument.symbol, "EURUSD");
        assert_eq!(config.params.start, [50.0, 150.0, 75.0, 3.0]);
    }

    #[test]
    fn parses_full_toml() {
        let toml = r#"
            [instrument]
            symbol = "GBPUSD"
            data = "prices.csv"
            start = "2020-01-01"
            end = "2020-03-31"

            [session]
            timezone = "Europe/London"
            start_hour = 7
            end_hour = 16

            [costs]
            rate = 0.0001

            [combination]
            mode = "unanimous"
            on_invalid_params = "penalty"
            penalty = 10.0

            [params]
            start = [20, 60, 30, 2.5]
            bounds = [[10, 40], [50, 120], [20, 60], [1, 4]]

            [optimizer]
            method = "random"
            samples = 50
            seed = 7
        "#;
        let config = CombinationConfig::from_toml(toml).unwrap();
        assert_eq!(config.instrument.symbol, "GBPUSD");
        assert_eq!(config.combination.mode, CombinationMode::Unanimous);
        assert_eq!(config.combination.on_invalid_params, InvalidParamPolicy::Penalty);
        assert_eq!(config.params.start, [20.0, 60.0, 30.0, 2.5]);
        assert_eq!(config.optimizer.method, OptimizerMethod::Random);
        assert_eq!(config.optimizer.max_iterations, 20);
        assert_eq!(config.sweep, SweepConfig::default());
    }

    #[test]
    fn unknown_timezone_fails_at_load() {
        let err = CombinationConfig::from_toml("[session]\ntimezone = \"Nowhere/City\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Session(FilterError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn start_outside_bounds_rejected() {
        let err = CombinationConfig::from_toml("[params]\nstart = [10, 150, 75, 3]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn oversized_sweep_grid_rejected() {
        let err = CombinationConfig::from_toml("[sweep]\nsteps = [1e-12, 50, 25, 2]").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(ref m) if m.contains("sweep grid")));
    }

    #[test]
    fn inverted_dates_rejected() {
        let toml = "[instrument]\nstart = \"2020-05-01\"\nend = \"2020-01-01\"";
        assert!(CombinationConfig::from_toml(toml).is_err());
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(CombinationConfig::from_toml("[costs]\nrat = 0.1").is_err());
    }

    #[test]
    fn run_id_is_stable_and_content_addressed() {
        let a = CombinationConfig::default();
        let mut b = a.clone();
        assert_eq!(a.run_id().unwrap(), b.run_id().unwrap());
        b.costs.rate = 0.0;
        assert_ne!(a.run_id().unwrap(), b.run_id().unwrap());
    }

    #[test]
    fn relative_data_path_resolved_against_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("study.toml");
        std::fs::write(&path, "[instrument]\ndata = \"prices.csv\"").unwrap();
        let config = CombinationConfig::load(&path).unwrap();
        assert_eq!(config.instrument.data, Some(dir.path().join("prices.csv")));
    }
}
