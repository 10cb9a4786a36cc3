//! Protection requirement scores
//!
//! A [`Score`] rates confidentiality, integrity, or availability of an asset
//! on a closed 0..=100 scale with six named bands.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error for scores outside the closed range
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("score must be between 0 and 100: {0}")]
pub struct ScoreOutOfRange(pub u32);

/// A protection requirement score in 0..=100
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "u32", into = "u32")]
pub struct Score(u8);

impl Score {
    /// No protection requirement (0)
    pub const NONE: Self = Self(0);
    /// Very low protection requirement (20)
    pub const VERY_LOW: Self = Self(20);
    /// Low protection requirement (40)
    pub const LOW: Self = Self(40);
    /// Medium protection requirement (60)
    pub const MEDIUM: Self = Self(60);
    /// High protection requirement (80)
    pub const HIGH: Self = Self(80);
    /// Very high protection requirement (100)
    pub const VERY_HIGH: Self = Self(100);

    /// Construct a score, rejecting values above 100
    pub fn new(value: u32) -> Result<Self, ScoreOutOfRange> {
        if value > 100 {
            return Err(ScoreOutOfRange(value));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(Self(value as u8))
    }

    /// The numeric value
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0 as u32
    }
}

impl TryFrom<u32> for Score {
    type Error = ScoreOutOfRange;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u32 {
    fn from(score: Score) -> Self {
        score.value()
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let band = match self.0 {
            0 => "None",
            1..=20 => "Very Low",
            21..=40 => "Low",
            41..=60 => "Medium",
            61..=80 => "High",
            _ => "Very High",
        };
        write!(f, "{band}")
    }
}
