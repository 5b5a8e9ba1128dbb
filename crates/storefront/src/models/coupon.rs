//! Coupons as stored by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use phonestore_core::{Cents, CouponId};

/// A discount percentage between 0 and 100 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DiscountPercent(u8);

impl DiscountPercent {
    /// Create a percentage, returning `None` above 100.
    #[must_use]
    pub const fn new(percent: u8) -> Option<Self> {
        if percent <= 100 { Some(Self(percent)) } else { None }
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DiscountPercent {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("discount percent must be at most 100 (got {value})"))
    }
}

impl From<DiscountPercent> for u8 {
    fn from(percent: DiscountPercent) -> Self {
        percent.0
    }
}

/// A percentage-off coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub discount_percent: DiscountPercent,
    pub active: bool,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    /// Minimum cart subtotal in whole reais (not centavos).
    #[serde(default)]
    pub min_purchase_value: Option<i64>,
    /// Categories the coupon is advertised for. Informational only; the
    /// discount applies to the whole subtotal.
    #[serde(default)]
    pub allowed_categories: Option<Vec<String>>,
}

impl Coupon {
    /// Whether the coupon's validity window closed strictly before `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|until| until < now)
    }

    /// Minimum subtotal in centavos, if the coupon has one.
    #[must_use]
    pub fn minimum_purchase(&self) -> Option<Cents> {
        self.min_purchase_value.map(Cents::from_whole_units)
    }
}
