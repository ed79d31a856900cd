use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Seconds in a civil day; also the representation of `24:00:00`.
pub const SECONDS_PER_DAY: u32 = 86_400;

/// Time of day with second granularity, as stored in a Postgres `TIME` column.
///
/// Valid range is `00:00:00..=24:00:00`; `24:00` denotes the midnight that
/// closes the day and is only accepted with zero minutes and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u32);

/// Reasons a textual time of day is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeParseError {
    #[error("missing colon separator: {0}")]
    MissingSeparator(String),
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("contains non-numeric values: {0}")]
    NonNumeric(String),
    #[error("hour out of range (0-24): {0}")]
    HourOutOfRange(u32),
    #[error("minute out of range (0-59): {0}")]
    MinuteOutOfRange(u32),
    #[error("second out of range (0-59): {0}")]
    SecondOutOfRange(u32),
    #[error("invalid time {0}, only 24:00 is valid")]
    PastMidnight(String),
}

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);
    pub const NOON: TimeOfDay = TimeOfDay(12 * 3600);
    pub const END_OF_DAY: TimeOfDay = TimeOfDay(SECONDS_PER_DAY);

    /// Build from hour/minute/second components, rejecting out-of-range values.
    pub fn from_hms(hour: u32, minute: u32, second: u32) -> Result<Self, TimeParseError> {
        if hour > 24 {
            return Err(TimeParseError::HourOutOfRange(hour));
        }
        if minute > 59 {
            return Err(TimeParseError::MinuteOutOfRange(minute));
        }
        if second > 59 {
            return Err(TimeParseError::SecondOutOfRange(second));
        }
        if hour == 24 && (minute != 0 || second != 0) {
            return Err(TimeParseError::PastMidnight(format!(
                "24:{:02}:{:02}",
                minute, second
            )));
        }
        Ok(Self(hour * 3600 + minute * 60 + second))
    }

    /// Build from seconds since midnight. Returns `None` past `24:00:00`.
    pub fn from_seconds(seconds: u32) -> Option<Self> {
        (seconds <= SECONDS_PER_DAY).then_some(Self(seconds))
    }

    pub fn seconds(&self) -> u32 {
        self.0
    }

    pub fn hour(&self) -> u32 {
        self.0 / 3600
    }

    pub fn minute(&self) -> u32 {
        (self.0 % 3600) / 60
    }

    pub fn second(&self) -> u32 {
        self.0 % 60
    }
}

impl FromStr for TimeOfDay {
    type Err = TimeParseError;

    /// Parse `HH:MM` or `HH:MM:SS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.contains(':') {
            return Err(TimeParseError::MissingSeparator(s.to_string()));
        }

        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(TimeParseError::InvalidFormat(s.to_string()));
        }

        let mut fields = [0u32; 3];
        for (slot, part) in fields.iter_mut().zip(parts.iter()) {
            *slot = part
                .trim()
                .parse::<u32>()
                .map_err(|_| TimeParseError::NonNumeric(s.to_string()))?;
        }

        Self::from_hms(fields[0], fields[1], fields[2])
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
