//! Integer money amounts in centavos.
//!
//! All cart arithmetic is done in the smallest currency unit so that sums are
//! exact. Percentages go through [`rust_decimal`] and are rounded half away
//! from zero, matching the storefront's historical `Math.round` behaviour for
//! non-negative amounts.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, Mul, Sub};

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A monetary amount in centavos (1/100 of a Brazilian real).
///
/// ```
/// use phonestore_core::Cents;
///
/// let price = Cents::new(150_000);
/// assert_eq!(price * 3, Cents::new(450_000));
/// assert_eq!(Cents::new(450_000).percent(10), Cents::new(45_000));
/// assert_eq!(Cents::new(150_000).to_string(), "R$ 1.500,00");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Zero centavos.
    pub const ZERO: Self = Self(0);

    /// Create an amount from a raw centavo count.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Create an amount from whole currency units (reais).
    #[must_use]
    pub const fn from_whole_units(units: i64) -> Self {
        Self(units.saturating_mul(100))
    }

    /// Get the raw centavo count.
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// `percent`% of this amount, rounded to the nearest centavo (half away from zero).
    #[must_use]
    pub fn percent(&self, percent: u8) -> Self {
        let exact = Decimal::from(self.0) * Decimal::from(percent) / Decimal::ONE_HUNDRED;
        let rounded = exact.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        // |result| <= |self| for percent <= 100, and callers never pass more.
        Self(rounded.to_i64().unwrap_or(self.0))
    }

    /// Subtract, flooring at zero.
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        let value = self.0.saturating_sub(rhs.0);
        if value < 0 { Self(0) } else { Self(value) }
    }
}

impl Add for Cents {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Cents {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Mul<u32> for Cents {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self(self.0.saturating_mul(i64::from(rhs)))
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl From<i64> for Cents {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl fmt::Display for Cents {
    /// Brazilian formatting: `R$ 1.234,56`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = (abs / 100).to_string();
        let fraction = abs % 100;

        let mut grouped = String::with_capacity(units.len() + units.len() / 3);
        for (i, ch) in units.chars().enumerate() {
            if i > 0 && (units.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        write!(f, "{sign}R$ {grouped},{fraction:02}")
    }
}
