use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A signed span of time in whole seconds.
/// Gaps between two events can be negative, hence the signed representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Duration(i32);

// static functions
impl Duration {
    pub const ZERO: Duration = Duration(0);

    /// Parses "hh:mm" or "hh:mm:ss". Panics on malformed input, use `str::parse` to get a Result.
    pub fn new(string: &str) -> Duration {
        string
            .parse()
            .unwrap_or_else(|err| panic!("invalid duration '{}': {}", string, err))
    }

    pub fn from_seconds(seconds: i32) -> Duration {
        Duration(seconds)
    }

    pub fn from_minutes(minutes: i32) -> Duration {
        Duration(minutes * 60)
    }

    pub fn from_hours_f64(hours: f64) -> Duration {
        Duration((hours * 3600.0).round() as i32)
    }
}

// methods
impl Duration {
    pub fn in_sec(&self) -> i32 {
        self.0
    }

    pub fn in_min(&self) -> f64 {
        self.0 as f64 / 60.0
    }

    pub fn in_hours(&self) -> f64 {
        self.0 as f64 / 3600.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative durations to zero.
    pub fn non_negative(self) -> Duration {
        Duration(self.0.max(0))
    }
}

impl FromStr for Duration {
    type Err = String;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let (negative, body) = match string.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, string),
        };
        let parts: Vec<&str> = body.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(format!("expected hh:mm[:ss], got '{}'", string));
        }
        let mut values = [0i32; 3];
        for (i, part) in parts.iter().enumerate() {
            values[i] = part
                .trim()
                .parse::<i32>()
                .map_err(|_| format!("'{}' is not a number", part))?;
            if values[i] < 0 || (i > 0 && values[i] >= 60) {
                return Err(format!("'{}' is out of range", part));
            }
        }
        let seconds = values[0] * 3600 + values[1] * 60 + values[2];
        Ok(Duration(if negative { -seconds } else { seconds }))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(
            f,
            "{}{:02}:{:02}:{:02}",
            sign,
            abs / 3600,
            (abs % 3600) / 60,
            abs % 60
        )
    }
}

impl Add for Duration {
    type Output = Duration;

    fn add(self, other: Duration) -> Duration {
        Duration(self.0 + other.0)
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, other: Duration) {
        self.0 += other.0;
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, other: Duration) -> Duration {
        Duration(self.0 - other.0)
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, other: Duration) {
        self.0 -= other.0;
    }
}

impl Neg for Duration {
    type Output = Duration;

    fn neg(self) -> Duration {
        Duration(-self.0)
    }
}

impl Mul<i32> for Duration {
    type Output = Duration;

    fn mul(self, factor: i32) -> Duration {
        Duration(self.0 * factor)
    }
}

impl Sum for Duration {
    fn sum<I: Iterator<Item = Duration>>(iter: I) -> Duration {
        iter.fold(Duration::ZERO, |a, b| a + b)
    }
}
