//! Signal combiner: merges aligned position series bar by bar.
//!
//! Every bar is decided from the sources' positions at that same bar only,
//! so combining never looks ahead and never carries state between bars.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ensure_aligned, Position, PositionSeries, SeriesError};

/// Failures while combining sources.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CombineError {
    #[error("at least two sources are required to combine, got {got}")]
    TooFewSources { got: usize },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Decides one combined position from the sources' votes at a single bar.
///
/// Implementations must be pure: the same votes always produce the same
/// position, whatever their order.
pub trait VotingRule: Send + Sync {
    /// Human-readable name (e.g., "majority").
    fn name(&self) -> &str;

    fn decide(&self, votes: &[Position]) -> Position;
}

/// Sign of the vote sum. Ties and an empty ballot are flat.
#[derive(Debug, Clone, Copy, Default)]
pub struct Majority;

impl VotingRule for Majority {
    fn name(&self) -> &str {
        "majority"
    }

    fn decide(&self, votes: &[Position]) -> Position {
        Position::from_sign(votes.iter().map(|v| i32::from(v.value())).sum())
    }
}

/// The common position when every source agrees, flat otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unanimous;

impl VotingRule for Unanimous {
    fn name(&self) -> &str {
        "unanimous"
    }

    fn decide(&self, votes: &[Position]) -> Position {
        match votes.split_first() {
            Some((first, rest)) if rest.iter().all(|v| v == first) => *first,
            _ => Position::Flat,
        }
    }
}

/// Configurable choice of voting rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinationMode {
    #[default]
    Majority,
    Unanimous,
}

impl CombinationMode {
    pub fn rule(self) -> Box<dyn VotingRule> {
        match self {
            CombinationMode::Majority => Box::new(Majority),
            CombinationMode::Unanimous => Box::new(Unanimous),
        }
    }
}

/// Applies a [`VotingRule`] across K >= 2 aligned position series.
pub struct SignalCombiner {
    rule: Box<dyn VotingRule>,
}

impl std::fmt::Debug for SignalCombiner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalCombiner")
            .field("rule", &self.rule.name())
            .finish()
    }
}

impl SignalCombiner {
    pub fn new(rule: Box<dyn VotingRule>) -> Self {
        Self { rule }
    }

    pub fn from_mode(mode: CombinationMode) -> Self {
        Self::new(mode.rule())
    }

    pub fn rule_name(&self) -> &str {
        self.rule.name()
    }

    /// Combine the sources into one series over their shared index.
    pub fn combine(&self, sources: &[&PositionSeries]) -> Result<PositionSeries, CombineError> {
        let (first, rest) = match sources.split_first() {
            Some(split) if !split.1.is_empty() => split,
            _ => {
                return Err(CombineError::TooFewSources {
                    got: sources.len(),
                })
            }
        };
        for other in rest {
            ensure_aligned(first.index(), "source positions", other.index(), "source positions")?;
        }

        let mut votes = Vec::with_capacity(sources.len());
        let combined: Vec<Position> = (0..first.len())
            .map(|t| {
                votes.clear();
                votes.extend(sources.iter().map(|s| s.values()[t]));
                self.rule.decide(&votes)
            })
            .collect();

        Ok(PositionSeries::new(first.index().clone(), combined)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeIndex;
    use crate::indicators::make_bars;
    use Position::{Flat, Long, Short};

    fn series(values: &[Position]) -> PositionSeries {
        let idx = TimeIndex::new(make_bars(&vec![1.0; values.len()]).iter().map(|b| b.time).collect())
            .unwrap();
        PositionSeries::new(idx, values.to_vec()).unwrap()
    }

    #[test]
    fn majority_is_sign_of_sum() {
        assert_eq!(Majority.decide(&[Long, Long, Short]), Long);
        assert_eq!(Majority.decide(&[Long, Short]), Flat);
        assert_eq!(Majority.decide(&[Short, Flat]), Short);
        assert_eq!(Majority.decide(&[]), Flat);
    }

    #[test]
    fn unanimous_requires_agreement() {
        assert_eq!(Unanimous.decide(&[Long, Long]), Long);
        assert_eq!(Unanimous.decide(&[Short, Short, Short]), Short);
        assert_eq!(Unanimous.decide(&[Long, Flat]), Flat);
        assert_eq!(Unanimous.decide(&[]), Flat);
    }

    #[test]
    fn combines_two_sources() {
        let a = series(&[Long, Long, Flat, Short]);
        let b = series(&[Long, Flat, Short, Short]);

        let majority = SignalCombiner::from_mode(CombinationMode::Majority)
            .combine(&[&a, &b])
            .unwrap();
        assert_eq!(majority.values(), &[Long, Long, Short, Short]);

        let unanimous = SignalCombiner::from_mode(CombinationMode::Unanimous)
            .combine(&[&a, &b])
            .unwrap();
        assert_eq!(unanimous.values(), &[Long, Flat, Flat, Short]);
        assert!(unanimous.index().same_as(a.index()));
    }

    #[test]
    fn single_source_rejected() {
        let a = series(&[Long]);
        let err = SignalCombiner::from_mode(CombinationMode::Majority)
            .combine(&[&a])
            .unwrap_err();
        assert_eq!(err, CombineError::TooFewSources { got: 1 });
    }

    #[test]
    fn misaligned_sources_rejected() {
        let a = series(&[Long, Long, Long]);
        let b = series(&[Long, Long]);
        let err = SignalCombiner::from_mode(CombinationMode::Unanimous)
            .combine(&[&a, &b])
            .unwrap_err();
        assert!(matches!(err, CombineError::Series(SeriesError::Misaligned { .. })));
    }

    #[test]
    fn mode_parses_from_snake_case() {
        let mode: CombinationMode = serde_json::from_str("\"unanimous\"").unwrap();
        assert_eq!(mode, CombinationMode::Unanimous);
        assert_eq!(mode.rule().name(), "unanimous");
    }
}
