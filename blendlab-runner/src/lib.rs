//! BlendLab Runner — configuration, data loading, objective, optimizers,
//! sweeps, metrics.
//!
//! This crate builds on `blendlab-core` to provide:
//! - TOML configuration with a content-addressed run id
//! - CSV and synthetic price feeds
//! - The parametric objective over `[sma_short, sma_long, mr_window, mr_deviation]`
//! - Bounded Powell and seeded random-search minimizers
//! - Parallel grid sweeps
//! - Performance metrics and JSON/CSV export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod objective;
pub mod optimizer;
pub mod runner;
pub mod sweep;

pub use config::{
    CombinationConfig, ConfigError, InvalidParamPolicy, OptimizerConfig, OptimizerMethod, RunId,
};
pub use data_loader::{load_price_feed, read_price_feed, synthetic_feed, LoadError, LoadedFeed};
pub use metrics::PerformanceMetrics;
pub use objective::{CombinationRun, Objective, ObjectiveError, SourceParams, PARAM_COUNT};
pub use optimizer::{
    minimizer_for, Minimizer, Minimum, OptimizeError, ParamBounds, Powell, RandomSearch,
};
pub use runner::{load_feed, optimize, run_combination, sweep, RunError, RunReport};
pub use sweep::{ParamGrid, ParamSweep, SweepEntry, SweepResults};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn objective_is_send_sync() {
        assert_send::<Objective>();
        assert_sync::<Objective>();
    }

    #[test]
    fn results_are_send_sync() {
        assert_send::<RunReport>();
        assert_sync::<RunReport>();
        assert_send::<SweepResults>();
        assert_sync::<SweepResults>();
        assert_send::<CombinationRun>();
        assert_sync::<CombinationRun>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<CombinationConfig>();
        assert_sync::<CombinationConfig>();
        assert_send::<LoadedFeed>();
        assert_sync::<LoadedFeed>();
    }
}
