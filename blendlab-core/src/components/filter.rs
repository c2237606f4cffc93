//! Session filter: forces positions flat outside a local-time trading window.
//!
//! Timestamps are converted to the configured zone with the tz database, so
//! daylight-saving transitions move the session in UTC terms. The window is
//! inclusive of both bounds, in whole local hours.

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::domain::{Position, PositionSeries};

/// Invalid session configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("session hour {0} is outside 0..=23")]
    InvalidHour(u32),

    #[error("session start hour {start} is after end hour {end}")]
    InvertedHours { start: u32, end: u32 },
}

/// Local-hour session gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionFilter {
    tz: Tz,
    start_hour: u32,
    end_hour: u32,
}

impl SessionFilter {
    /// Build from an IANA zone name such as `America/New_York`.
    pub fn new(timezone: &str, start_hour: u32, end_hour: u32) -> Result<Self, FilterError> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| FilterError::UnknownTimezone(timezone.to_string()))?;
        Self::with_tz(tz, start_hour, end_hour)
    }

    pub fn with_tz(tz: Tz, start_hour: u32, end_hour: u32) -> Result<Self, FilterError> {
        for hour in [start_hour, end_hour] {
            if hour > 23 {
                return Err(FilterError::InvalidHour(hour));
            }
        }
        if start_hour > end_hour {
            return Err(FilterError::InvertedHours {
                start: start_hour,
                end: end_hour,
            });
        }
        Ok(Self {
            tz,
            start_hour,
            end_hour,
        })
    }

    /// A session covering the whole day in UTC.
    pub fn always_open() -> Self {
        Self {
            tz: Tz::UTC,
            start_hour: 0,
            end_hour: 23,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn hours(&self) -> (u32, u32) {
        (self.start_hour, self.end_hour)
    }

    /// Wall-clock hour of `time` in the session's zone.
    pub fn local_hour(&self, time: DateTime<Utc>) -> u32 {
        time.with_timezone(&self.tz).hour()
    }

    pub fn contains_hour(&self, hour: u32) -> bool {
        (self.start_hour..=self.end_hour).contains(&hour)
    }

    pub fn is_open(&self, time: DateTime<Utc>) -> bool {
        self.contains_hour(self.local_hour(time))
    }

    /// Flatten every position whose bar falls outside the session.
    pub fn apply(&self, positions: &PositionSeries) -> FilteredPositions {
        let in_session: Vec<bool> = positions
            .index()
            .as_slice()
            .iter()
            .map(|&t| self.is_open(t))
            .collect();
        let gated = positions.map(|i, p| if in_session[i] { p } else { Position::Flat });
        FilteredPositions {
            positions: gated,
            in_session,
        }
    }
}

/// Positions after session gating, with the per-bar session mask.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredPositions {
    positions: PositionSeries,
    in_session: Vec<bool>,
}

impl FilteredPositions {
    /// Wrap positions that are not session restricted.
    pub fn unrestricted(positions: PositionSeries) -> Self {
        let in_session = vec![true; positions.len()];
        Self {
            positions,
            in_session,
        }
    }

    pub fn positions(&self) -> &PositionSeries {
        &self.positions
    }

    pub fn in_session(&self) -> &[bool] {
        &self.in_session
    }

    /// Number of bars inside the session.
    pub fn active_bars(&self) -> usize {
        self.in_session.iter().filter(|&&open| open).count()
    }

    pub fn into_positions(self) -> PositionSeries {
        self.positions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeIndex;
    use chrono::TimeZone;
    use Position::{Flat, Long, Short};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn gates_by_local_hour() {
        let times: Vec<_> = [1, 2, 3, 12, 13].iter().map(|&h| at(2020, 3, 2, h)).collect();
        let positions = PositionSeries::new(TimeIndex::new(times).unwrap(), vec![Long; 5]).unwrap();
        let filter = SessionFilter::new("UTC", 2, 12).unwrap();

        let out = filter.apply(&positions);
        assert_eq!(out.positions().values(), &[Flat, Long, Long, Long, Flat]);
        assert_eq!(out.in_session(), &[false, true, true, true, false]);
        assert_eq!(out.active_bars(), 3);
        assert!(out.positions().index().same_as(positions.index()));
    }

    #[test]
    fn follows_daylight_saving() {
        let filter = SessionFilter::new("America/New_York", 2, 12).unwrap();
        // 02:00 local in both cases: EDT is UTC-4, EST is UTC-5.
        assert_eq!(filter.local_hour(at(2020, 7, 1, 6)), 2);
        assert_eq!(filter.local_hour(at(2020, 1, 15, 7)), 2);
        assert!(filter.is_open(at(2020, 7, 1, 6)));
        // 06:00 UTC in January is 01:00 EST.
        assert!(!filter.is_open(at(2020, 1, 15, 6)));
    }

    #[test]
    fn rejects_bad_configuration() {
        assert_eq!(
            SessionFilter::new("Mars/Olympus", 2, 12).unwrap_err(),
            FilterError::UnknownTimezone("Mars/Olympus".into())
        );
        assert_eq!(
            SessionFilter::new("UTC", 2, 24).unwrap_err(),
            FilterError::InvalidHour(24)
        );
        assert_eq!(
            SessionFilter::new("UTC", 13, 12).unwrap_err(),
            FilterError::InvertedHours { start: 13, end: 12 }
        );
    }

    #[test]
    fn unrestricted_marks_all_active() {
        let times: Vec<_> = (0..3).map(|h| at(2020, 3, 2, h)).collect();
        let positions =
            PositionSeries::new(TimeIndex::new(times).unwrap(), vec![Short, Flat, Long]).unwrap();
        let out = FilteredPositions::unrestricted(positions);
        assert_eq!(out.active_bars(), 3);
    }

    #[test]
    fn always_open_passes_everything() {
        let filter = SessionFilter::always_open();
        assert!((0..24).all(|h| filter.is_open(at(2021, 6, 1, h))));
    }
}
