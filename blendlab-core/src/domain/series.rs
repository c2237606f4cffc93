//! Time-indexed series shared by every stage of the combination pipeline.
//!
//! All series used together must be defined over the identical index.
//! Nothing here reindexes or forward-fills: a mismatch is an error.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use super::Position;

/// Violations of the shared-index contract.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("time index is not strictly increasing at position {position}")]
    NotIncreasing { position: usize },

    #[error("{what} has {len} values but its index has {index_len} timestamps")]
    LengthMismatch {
        what: &'static str,
        len: usize,
        index_len: usize,
    },

    #[error("{left} and {right} are defined over different time indices")]
    Misaligned {
        left: &'static str,
        right: &'static str,
    },
}

/// Ordered, strictly increasing sequence of bar timestamps.
///
/// Cheap to clone: derived series share the same allocation, which also
/// makes the common alignment check a pointer comparison.
#[derive(Debug, Clone)]
pub struct TimeIndex(Arc<[DateTime<Utc>]>);

impl TimeIndex {
    pub fn new(times: Vec<DateTime<Utc>>) -> Result<Self, SeriesError> {
        if let Some(position) = times.windows(2).position(|w| w[1] <= w[0]) {
            return Err(SeriesError::NotIncreasing {
                position: position + 1,
            });
        }
        Ok(Self(times.into()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[DateTime<Utc>] {
        &self.0
    }

    pub fn get(&self, i: usize) -> Option<DateTime<Utc>> {
        self.0.get(i).copied()
    }

    pub fn first(&self) -> Option<DateTime<Utc>> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<DateTime<Utc>> {
        self.0.last().copied()
    }

    /// Index without its first `n` timestamps.
    pub fn skip(&self, n: usize) -> TimeIndex {
        let start = n.min(self.0.len());
        Self(self.0[start..].into())
    }

    /// True when both indices hold exactly the same timestamps.
    pub fn same_as(&self, other: &TimeIndex) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl PartialEq for TimeIndex {
    fn eq(&self, other: &Self) -> bool {
        self.same_as(other)
    }
}

/// Fail fast unless two indices are identical.
pub fn ensure_aligned(
    left: &TimeIndex,
    left_name: &'static str,
    right: &TimeIndex,
    right_name: &'static str,
) -> Result<(), SeriesError> {
    if left.same_as(right) {
        Ok(())
    } else {
        Err(SeriesError::Misaligned {
            left: left_name,
            right: right_name,
        })
    }
}

/// Log-returns aligned to a time index. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    index: TimeIndex,
    values: Vec<f64>,
}

impl ReturnSeries {
    pub fn new(index: TimeIndex, values: Vec<f64>) -> Result<Self, SeriesError> {
        if values.len() != index.len() {
            return Err(SeriesError::LengthMismatch {
                what: "return series",
                len: values.len(),
                index_len: index.len(),
            });
        }
        Ok(Self { index, values })
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The series without its first `n` rows.
    pub fn skip(&self, n: usize) -> ReturnSeries {
        let start = n.min(self.values.len());
        Self {
            index: self.index.skip(start),
            values: self.values[start..].to_vec(),
        }
    }
}

/// Positions in {-1, 0, +1} aligned to a time index.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSeries {
    index: TimeIndex,
    values: Vec<Position>,
}

impl PositionSeries {
    pub fn new(index: TimeIndex, values: Vec<Position>) -> Result<Self, SeriesError> {
        if values.len() != index.len() {
            return Err(SeriesError::LengthMismatch {
                what: "position series",
                len: values.len(),
                index_len: index.len(),
            });
        }
        Ok(Self { index, values })
    }

    pub fn index(&self) -> &TimeIndex {
        &self.index
    }

    pub fn values(&self) -> &[Position] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The series without its first `n` rows.
    pub fn skip(&self, n: usize) -> PositionSeries {
        let start = n.min(self.values.len());
        Self {
            index: self.index.skip(start),
            values: self.values[start..].to_vec(),
        }
    }

    /// Same index, each value replaced by `f(bar, value)`.
    pub fn map(&self, mut f: impl FnMut(usize, Position) -> Position) -> PositionSeries {
        Self {
            index: self.index.clone(),
            values: self.values.iter().enumerate().map(|(i, &p)| f(i, p)).collect(),
        }
    }
}
