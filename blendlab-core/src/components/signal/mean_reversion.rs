//! Bollinger mean-reversion source.
//!
//! Goes long below the lower band and short above the upper band, exits to
//! flat when the close crosses the moving average, and otherwise holds the
//! previous position.

use crate::domain::{Bar, Position};
use crate::indicators::Bollinger;

use super::{closes, SignalSource, SourceError};

#[derive(Debug, Clone)]
pub struct MeanReversion {
    window: usize,
    deviation: f64,
    bands: Bollinger,
}

impl MeanReversion {
    /// `window` >= 2 bars, `deviation` a positive band multiplier.
    pub fn new(window: usize, deviation: f64) -> Result<Self, SourceError> {
        if window < 2 {
            return Err(invalid(format!("window must be >= 2, got {window}")));
        }
        if !deviation.is_finite() || deviation <= 0.0 {
            return Err(invalid(format!(
                "deviation must be finite and positive, got {deviation}"
            )));
        }
        Ok(Self {
            window,
            deviation,
            bands: Bollinger::new(window, deviation),
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn deviation(&self) -> f64 {
        self.deviation
    }
}

fn invalid(reason: String) -> SourceError {
    SourceError::InvalidParameters {
        source_name: "mean_reversion",
        reason,
    }
}

impl SignalSource for MeanReversion {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn warmup_bars(&self) -> usize {
        self.bands.lookback()
    }

    fn positions(&self, bars: &[Bar]) -> Vec<Position> {
        let closes = closes(bars);
        let bands = self.bands.compute(&closes);

        let mut out = Vec::with_capacity(closes.len());
        let mut held = Position::Flat;
        let mut prev_distance = f64::NAN;
        for (i, &close) in closes.iter().enumerate() {
            let distance = close - bands.middle[i];

            let mut signal = None;
            if close < bands.lower[i] {
                signal = Some(Position::Long);
            }
            if close > bands.upper[i] {
                signal = Some(Position::Short);
            }
            // Crossing the mean takes precedence over a band breach.
            if distance * prev_distance < 0.0 {
                signal = Some(Position::Flat);
            }

            if let Some(p) = signal {
                held = p;
            }
            out.push(held);
            prev_distance = distance;
        }
        out
    }
}
