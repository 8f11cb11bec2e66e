use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{AppError, Result};

/// Sampling granularity of a candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Minute,
    Hour,
    Day,
    Month,
    Year,
}

impl Frequency {
    pub const ALL: [Frequency; 5] = [
        Frequency::Minute,
        Frequency::Hour,
        Frequency::Day,
        Frequency::Month,
        Frequency::Year,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Minute => "minute",
            Frequency::Hour => "hour",
            Frequency::Day => "day",
            Frequency::Month => "month",
            Frequency::Year => "year",
        }
    }

    /// Provider `interval` query value for this frequency.
    pub fn interval_code(self) -> &'static str {
        match self {
            Frequency::Minute => "1m",
            Frequency::Hour => "1h",
            Frequency::Day => "1d",
            Frequency::Month => "1mo",
            // Provider support is unconfirmed; passed through as-is.
            Frequency::Year => "year",
        }
    }
}

/// Parse a raw frequency label and return its provider interval code.
pub fn interval_code_for(raw: &str) -> Result<&'static str> {
    raw.parse::<Frequency>().map(Frequency::interval_code)
}

impl FromStr for Frequency {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self> {
        Frequency::ALL
            .into_iter()
            .find(|freq| freq.as_str() == value.trim())
            .ok_or_else(|| AppError::validation(format!("unsupported frequency: {value}")))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Frequency {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
