use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BookingError;

/// Fixed-point multiplier with two decimal places, stored as hundredths.
///
/// `Multiplier::from_hundredths(125)` is `1.25`. Persisted as `NUMERIC(6,2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Multiplier(i32);

impl Multiplier {
    pub const SCALE: i64 = 100;
    pub const ONE: Multiplier = Multiplier(100);
    /// Child fare used when a seat class is provisioned without one.
    pub const DEFAULT_CHILD: Multiplier = Multiplier(75);

    pub const fn from_hundredths(hundredths: i32) -> Self {
        Multiplier(hundredths)
    }

    pub fn hundredths(self) -> i32 {
        self.0
    }

    /// Converts a caller-supplied float to hundredths, dropping anything
    /// beyond two decimal digits.
    ///
    /// This is not plain truncation of `value * 100`: `1.15 * 100` is
    /// `114.999…` in binary floating point, which truncates to `114`. The
    /// `1e-9` nudge makes `1.15` store as `115`, the value the caller wrote.
    pub fn from_f64(value: f64) -> Result<Self, BookingError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(BookingError::InvalidRequest(format!(
                "multiplier must be a positive number, got {}",
                value
            )));
        }

        let scaled = (value * Self::SCALE as f64 + 1e-9).trunc();
        if scaled < 1.0 || scaled > 9_999.0 {
            return Err(BookingError::InvalidRequest(format!(
                "multiplier {} is outside the supported range 0.01..=99.99",
                value
            )));
        }

        Ok(Multiplier(scaled as i32))
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Price of a ticket in minor currency units.
///
/// Both multipliers are applied in a single step so that rounding happens
/// once, not per factor.
pub fn fare(base_price: i64, class_multiplier: Multiplier, child_multiplier: Option<Multiplier>) -> i64 {
    let child = child_multiplier.unwrap_or(Multiplier::ONE);
    let denominator = Multiplier::SCALE * Multiplier::SCALE;
    let raw = base_price * class_multiplier.hundredths() as i64 * child.hundredths() as i64;
    (raw + denominator / 2).div_euclid(denominator)
}
