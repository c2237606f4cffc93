//! Component traits and their implementations.
//!
//! - Signal source: turns bars into positions
//! - Combiner: merges several sources' positions by a voting rule
//! - Session filter: flattens positions outside local trading hours
//!
//! Plus the indicator trait for precomputed numeric series.

pub mod combiner;
pub mod filter;
pub mod indicator;
pub mod signal;

pub use combiner::{CombinationMode, CombineError, Majority, SignalCombiner, Unanimous, VotingRule};
pub use filter::{FilterError, FilteredPositions, SessionFilter};
pub use indicator::Indicator;
pub use signal::{run_source, MeanReversion, SignalSource, SmaCrossover, SourceError, SourceResults};
