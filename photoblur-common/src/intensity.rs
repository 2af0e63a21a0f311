//! Blur intensity value type

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Blur intensity in percent (0 = sharp original, 100 = maximum blur)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Intensity(u8);

impl Intensity {
    /// Highest accepted intensity
    pub const MAX: Intensity = Intensity(100);

    /// Sharp original (no blur)
    pub const ZERO: Intensity = Intensity(0);

    /// Create an intensity, rejecting values above 100
    pub fn new(value: u8) -> Result<Self> {
        if value > Self::MAX.0 {
            return Err(Error::InvalidInput(format!(
                "intensity {} out of range 0..=100",
                value
            )));
        }
        Ok(Self(value))
    }

    /// Create an intensity from a raw control value, clamping into 0..=100
    pub fn saturating(value: i64) -> Self {
        Self(value.clamp(0, Self::MAX.0 as i64) as u8)
    }

    /// Raw percentage value
    pub fn value(self) -> u8 {
        self.0
    }

    /// True for the unblurred original
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<u8> for Intensity {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Intensity> for u8 {
    fn from(intensity: Intensity) -> u8 {
        intensity.0
    }
}

impl fmt::Display for Intensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
