//! Simple moving average crossover: long while the short SMA is above the
//! long SMA, short otherwise.

use crate::components::indicator::Indicator;
use crate::domain::{Bar, Position};
use crate::indicators::Sma;

use super::{closes, SignalSource, SourceError};

/// Two-SMA trend source.
///
/// # Indicator dependencies
/// - `sma_{short}` and `sma_{long}` over closes. Flat until both exist.
#[derive(Debug, Clone)]
pub struct SmaCrossover {
    short: Sma,
    long: Sma,
}

impl SmaCrossover {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, SourceError> {
        if short_window < 1 {
            return Err(invalid("short window must be >= 1".into()));
        }
        if short_window >= long_window {
            return Err(invalid(format!(
                "short window {short_window} must be below long window {long_window}"
            )));
        }
        Ok(Self {
            short: Sma::new(short_window),
            long: Sma::new(long_window),
        })
    }

    pub fn short_window(&self) -> usize {
        self.short.period()
    }

    pub fn long_window(&self) -> usize {
        self.long.period()
    }
}

fn invalid(reason: String) -> SourceError {
    SourceError::InvalidParameters {
        source_name: "sma_crossover",
        reason,
    }
}

impl SignalSource for SmaCrossover {
    fn name(&self) -> &str {
        "sma_crossover"
    }

    fn warmup_bars(&self) -> usize {
        self.long.lookback()
    }

    fn positions(&self, bars: &[Bar]) -> Vec<Position> {
        let closes = closes(bars);
        let fast = self.short.compute(&closes);
        let slow = self.long.compute(&closes);
        fast.iter()
            .zip(&slow)
            .map(|(&f, &s)| {
                if f.is_nan() || s.is_nan() {
                    Position::Flat
                } else if f > s {
                    Position::Long
                } else {
                    Position::Short
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;
    use Position::{Flat, Long, Short};

    #[test]
    fn rejects_inverted_windows() {
        assert!(SmaCrossover::new(5, 5).is_err());
        assert!(SmaCrossover::new(6, 5).is_err());
        assert!(SmaCrossover::new(0, 5).is_err());
        assert!(SmaCrossover::new(1, 2).is_ok());
    }

    #[test]
    fn flat_during_warmup() {
        let src = SmaCrossover::new(2, 4).unwrap();
        assert_eq!(src.warmup_bars(), 3);
        let pos = src.positions(&make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        assert_eq!(&pos[..3], &[Flat, Flat, Flat]);
    }

    #[test]
    fn follows_trend_direction() {
        let src = SmaCrossover::new(2, 3).unwrap();
        let rising = src.positions(&make_bars(&[1.0, 2.0, 3.0, 4.0]));
        assert_eq!(rising, vec![Flat, Flat, Long, Long]);

        let falling = src.positions(&make_bars(&[4.0, 3.0, 2.0, 1.0]));
        assert_eq!(falling, vec![Flat, Flat, Short, Short]);
    }

    #[test]
    fn equal_averages_are_short() {
        let src = SmaCrossover::new(1, 2).unwrap();
        let pos = src.positions(&make_bars(&[5.0, 5.0, 5.0]));
        assert_eq!(pos, vec![Flat, Short, Short]);
    }

    #[test]
    fn one_position_per_bar() {
        let src = SmaCrossover::new(3, 7).unwrap();
        let bars = make_bars(&(1..=20).map(f64::from).collect::<Vec<_>>());
        assert_eq!(src.positions(&bars).len(), bars.len());
    }
}
