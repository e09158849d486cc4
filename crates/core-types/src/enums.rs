use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The expected observation frequency of a feed.
///
/// Only `daily` drives gap detection today. Any other value is kept verbatim
/// so the quality report can say which policy was requested and why gap
/// detection was switched off.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Frequency {
    #[default]
    Daily,
    Unsupported(String),
}

impl Frequency {
    pub fn is_supported(&self) -> bool {
        matches!(self, Frequency::Daily)
    }
}

impl FromStr for Frequency {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

impl From<String> for Frequency {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("daily") {
            Frequency::Daily
        } else {
            Frequency::Unsupported(value)
        }
    }
}

impl From<Frequency> for String {
    fn from(value: Frequency) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Unsupported(name) => write!(f, "{name}"),
        }
    }
}
