//! Volume level as shown on the display.

use std::fmt;

use crate::error::{Error, Result};

/// Output volume as a whole percentage in `0..=100`.
///
/// This is also the wire format: a level is sent to the display as a single
/// raw byte with the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VolumeLevel(u8);

impl VolumeLevel {
    /// Level reported while the output is muted.
    pub const MUTED: Self = Self(0);
    /// Highest representable level.
    pub const MAX: Self = Self(100);

    /// Create a level from a whole percentage.
    ///
    /// # Errors
    /// Returns [`Error::InvalidVolume`] if `percent` is above 100.
    pub fn new(percent: u32) -> Result<Self> {
        match u8::try_from(percent) {
            Ok(p) if p <= Self::MAX.0 => Ok(Self(p)),
            _ => Err(Error::InvalidVolume(percent)),
        }
    }

    /// Derive a level from a mixer reading.
    ///
    /// `scalar` is the OS volume fraction (nominally 0.0 - 1.0). It is clamped
    /// and rounded to the nearest percent, ties to even; a NaN reading counts
    /// as silence. A muted output is always level 0, whatever the scalar says.
    ///
    /// The product is taken in `f64`: in `f32` a scalar such as 0.285 (really
    /// 0.28499999…) multiplies out to exactly 28.5 and rounds the wrong way.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_scalar(scalar: f32, muted: bool) -> Self {
        if muted || scalar.is_nan() {
            return Self::MUTED;
        }
        let percent = (f64::from(scalar).clamp(0.0, 1.0) * 100.0).round_ties_even();
        Self(percent as u8)
    }

    /// The level as a percentage.
    #[must_use]
    pub fn percent(self) -> u8 {
        self.0
    }

    /// The single byte written to the display.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        self.0
    }
}

impl fmt::Display for VolumeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
