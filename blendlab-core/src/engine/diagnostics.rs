//! Value counts over positions and trades, used for run summaries.

use serde::{Deserialize, Serialize};

use crate::domain::Position;

/// How many bars were spent short, flat and long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCounts {
    pub short: usize,
    pub flat: usize,
    pub long: usize,
}

impl PositionCounts {
    pub fn tally(positions: &[Position]) -> Self {
        positions.iter().fold(Self::default(), |mut acc, p| {
            match p {
                Position::Short => acc.short += 1,
                Position::Flat => acc.flat += 1,
                Position::Long => acc.long += 1,
            }
            acc
        })
    }

    pub fn total(&self) -> usize {
        self.short + self.flat + self.long
    }

    /// Fraction of bars with a non-flat position.
    pub fn exposure(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.short + self.long) as f64 / total as f64
    }
}

/// How many bars traded zero, one or two units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeCounts {
    pub zero: usize,
    pub one: usize,
    pub two: usize,
}

impl TradeCounts {
    pub fn tally(trades: &[u8]) -> Self {
        trades.iter().fold(Self::default(), |mut acc, t| {
            match t {
                0 => acc.zero += 1,
                1 => acc.one += 1,
                _ => acc.two += 1,
            }
            acc
        })
    }

    /// Total units traded.
    pub fn units(&self) -> usize {
        self.one + 2 * self.two
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_tally() {
        let c = PositionCounts::tally(&[Position::Long, Position::Flat, Position::Long, Position::Short]);
        assert_eq!(c, PositionCounts { short: 1, flat: 1, long: 2 });
        assert!((c.exposure() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn trade_tally() {
        let c = TradeCounts::tally(&[1, 0, 2, 0]);
        assert_eq!(c, TradeCounts { zero: 2, one: 1, two: 1 });
        assert_eq!(c.units(), 3);
    }

    #[test]
    fn empty_exposure_is_zero() {
        assert_eq!(PositionCounts::default().exposure(), 0.0);
    }
}
