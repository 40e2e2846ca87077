//! Two-digit board codes shown to customers for pickup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BoardError;

/// Number of distinct board codes. The counter wraps back to `00` after `99`.
pub const CODE_SPACE: u8 = 100;

/// A public order identifier in `00..=99`.
///
/// Codes compare numerically, which matches the lexicographic order of their
/// zero-padded rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BoardCode(u8);

impl BoardCode {
    /// Build a code from its numeric value, or `None` if it is outside the code space.
    pub fn new(value: u8) -> Option<Self> {
        (value < CODE_SPACE).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// The code issued after this one, wrapping `99` to `00`.
    pub fn next(self) -> Self {
        Self((self.0 + 1) % CODE_SPACE)
    }
}

impl fmt::Display for BoardCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

impl FromStr for BoardCode {
    type Err = BoardError;

    /// Accepts `"07"` as well as the unpadded `"7"` sent by older clients.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.len() > 2 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(BoardError::InvalidCode(s.to_string()));
        }
        trimmed
            .parse::<u8>()
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| BoardError::InvalidCode(s.to_string()))
    }
}

impl Serialize for BoardCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for BoardCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
