use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Duration;

/// A point in time of the service day, in seconds after midnight.
/// Service days run past midnight, so values above 24:00:00 are valid (e.g. 26:30 for a night
/// duty ending at 02:30 the next morning).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Time(i32);

// static functions
impl Time {
    pub const MIDNIGHT: Time = Time(0);

    /// Parses "hh:mm" or "hh:mm:ss". Panics on malformed input, use `str::parse` to get a Result.
    pub fn new(string: &str) -> Time {
        string
            .parse()
            .unwrap_or_else(|err| panic!("invalid time '{}': {}", string, err))
    }

    pub fn from_seconds(seconds: i32) -> Time {
        Time(seconds)
    }

    pub fn from_hours_f64(hours: f64) -> Time {
        Time((hours * 3600.0).round() as i32)
    }
}

// methods
impl Time {
    pub fn in_sec(&self) -> i32 {
        self.0
    }

    pub fn since_midnight(&self) -> Duration {
        Duration::from_seconds(self.0)
    }
}

impl FromStr for Time {
    type Err = String;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let duration: Duration = string.parse()?;
        if duration.is_negative() {
            return Err(format!("time '{}' lies before midnight", string));
        }
        Ok(Time(duration.in_sec()))
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Duration::from_seconds(self.0))
    }
}

impl Add<Duration> for Time {
    type Output = Time;

    fn add(self, other: Duration) -> Time {
        Time(self.0 + other.in_sec())
    }
}

impl Sub<Duration> for Time {
    type Output = Time;

    fn sub(self, other: Duration) -> Time {
        Time(self.0 - other.in_sec())
    }
}

impl Sub for Time {
    type Output = Duration;

    fn sub(self, other: Time) -> Duration {
        Duration::from_seconds(self.0 - other.0)
    }
}
