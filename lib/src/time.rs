use std::{fmt, ops};

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Unix timestamp of the J2000 epoch, 2000-01-01 12:00:00 UTC.
const J2000_UNIX: i64 = 946_728_000;

/// Simulation time, counted in seconds from J2000.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SimTime(Duration);

impl SimTime {
    pub fn new_seconds(sec: f64) -> SimTime {
        SimTime(Duration::seconds_f64(sec))
    }

    pub fn is_negative(self) -> bool {
        self.0.is_negative()
    }

    pub fn as_seconds(self) -> f64 {
        self.0.as_seconds_f64()
    }

    pub fn into_duration(self) -> Duration {
        self.0
    }

    pub fn from_duration(duration: Duration) -> Self {
        Self(duration)
    }

    /// The calendar date this time falls on, if representable.
    pub fn to_datetime(self) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp(J2000_UNIX)
            .ok()?
            .checked_add(self.0)
    }
}

impl ops::Sub<SimTime> for SimTime {
    type Output = Duration;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.0 - rhs.0
    }
}

impl ops::Sub<Duration> for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: Duration) -> Self::Output {
        SimTime(self.0 - rhs)
    }
}

impl ops::Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> Self::Output {
        SimTime(self.0 + rhs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) if !f.alternate() => write!(
                f,
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{}",
                dt.year(),
                dt.month() as u8,
                dt.day(),
                dt.hour(),
                dt.minute(),
                dt.second(),
                dt.millisecond() / 100
            ),
            _ => write!(f, "T{:+}s", self.0.as_seconds_f64()),
        }
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SimTime({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_is_j2000() {
        assert_eq!(SimTime::new_seconds(0.0).to_string(), "2000-01-01 12:00:00.0");
    }

    #[test]
    fn formats_days_and_tenths() {
        let t = SimTime::new_seconds(86_400.0 + 3_661.5);
        assert_eq!(t.to_string(), "2000-01-02 13:01:01.5");

        let before = SimTime::new_seconds(-43_200.0);
        assert!(before.is_negative());
        assert_eq!(before.to_string(), "2000-01-01 00:00:00.0");
    }

    #[test]
    fn alternate_shows_raw_seconds() {
        let t = SimTime::new_seconds(12.5);
        assert_eq!(format!("{t:#}"), "T+12.5s");
        assert_eq!(t + Duration::seconds(1) - t, Duration::seconds(1));
    }
}
