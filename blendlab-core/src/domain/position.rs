//! Position — desired directional exposure entering the next bar.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Directional exposure: short, flat or long one unit.
///
/// Serialised as the signed integer (-1, 0, 1) so exported tables read the
/// same way the position column of a results table does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
#[repr(i8)]
pub enum Position {
    Short = -1,
    #[default]
    Flat = 0,
    Long = 1,
}

impl Position {
    /// Signed value of the position.
    pub fn value(self) -> i8 {
        self as i8
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.value())
    }

    /// Sign of an arbitrary vote total. `from_sign(0)` is flat.
    pub fn from_sign(total: i32) -> Self {
        match total.signum() {
            1 => Position::Long,
            -1 => Position::Short,
            _ => Position::Flat,
        }
    }

    pub fn is_flat(self) -> bool {
        self == Position::Flat
    }

    /// Units traded when moving from `previous` to `self`: 0, 1 or 2.
    pub fn change_from(self, previous: Position) -> u8 {
        (self.value() - previous.value()).unsigned_abs()
    }
}

impl From<Position> for i8 {
    fn from(p: Position) -> Self {
        p.value()
    }
}

impl TryFrom<i8> for Position {
    type Error = String;

    fn try_from(v: i8) -> Result<Self, Self::Error> {
        match v {
            -1 => Ok(Position::Short),
            0 => Ok(Position::Flat),
            1 => Ok(Position::Long),
            other => Err(format!("position must be -1, 0 or 1, got {other}")),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_sign_maps_totals() {
        assert_eq!(Position::from_sign(2), Position::Long);
        assert_eq!(Position::from_sign(1), Position::Long);
        assert_eq!(Position::from_sign(0), Position::Flat);
        assert_eq!(Position::from_sign(-1), Position::Short);
        assert_eq!(Position::from_sign(-7), Position::Short);
    }

    #[test]
    fn change_counts_units() {
        assert_eq!(Position::Long.change_from(Position::Long), 0);
        assert_eq!(Position::Long.change_from(Position::Flat), 1);
        assert_eq!(Position::Flat.change_from(Position::Short), 1);
        assert_eq!(Position::Short.change_from(Position::Long), 2);
    }

    #[test]
    fn serializes_as_integer() {
        assert_eq!(serde_json::to_string(&Position::Short).unwrap(), "-1");
        let p: Position = serde_json::from_str("1").unwrap();
        assert_eq!(p, Position::Long);
        assert!(serde_json::from_str::<Position>("3").is_err());
    }
}
