//! Coupon validation.

use chrono::{DateTime, Utc};
use thiserror::Error;

use phonestore_core::Cents;

use crate::backend::CouponDirectory;
use crate::models::{Coupon, RetailProfile};

/// Why a coupon was not applied.
///
/// The `Display` text is meant for the shopper.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("Enter a coupon code")]
    EmptyCode,

    /// No retail customer is signed in. Admin and wholesale accounts are not
    /// customers for coupon purposes.
    #[error("Sign in to use coupons")]
    LoginRequired,

    /// The code does not exist or the coupon is disabled.
    #[error("Invalid coupon code")]
    InvalidCode,

    #[error("This coupon has expired")]
    Expired,

    #[error("This coupon requires a minimum purchase of {minimum}")]
    MinimumNotMet { minimum: Cents },

    #[error("You have already used this coupon")]
    AlreadyUsed,

    /// A lookup failed. The shopper can try again.
    #[error("Could not validate the coupon, please try again")]
    Unavailable,
}

impl CouponRejection {
    /// Short machine-readable name, used in logs and breadcrumbs.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::EmptyCode => "empty_code",
            Self::LoginRequired => "login_required",
            Self::InvalidCode => "invalid_code",
            Self::Expired => "expired",
            Self::MinimumNotMet { .. } => "minimum_not_met",
            Self::AlreadyUsed => "already_used",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Run the coupon checks for `code` against a cart worth `subtotal`.
///
/// Stops at the first failing check: expiry, then minimum purchase, then
/// prior use. A coupon that fails an earlier check never reaches the usage
/// lookup.
///
/// # Errors
///
/// Returns the first `CouponRejection` encountered.
#[tracing::instrument(skip(directory, customer), fields(customer_id))]
pub async fn validate_coupon(
    directory: &dyn CouponDirectory,
    code: &str,
    customer: Option<&RetailProfile>,
    subtotal: Cents,
    now: DateTime<Utc>,
) -> Result<Coupon, CouponRejection> {
    let code = code.trim();
    if code.is_empty() {
        return Err(CouponRejection::EmptyCode);
    }
    let customer = customer.ok_or(CouponRejection::LoginRequired)?;
    tracing::Span::current().record("customer_id", tracing::field::display(customer.id));

    let coupon = match directory.fetch_coupon(code).await {
        Ok(Some(coupon)) if coupon.active => coupon,
        Ok(_) => return Err(CouponRejection::InvalidCode),
        Err(e) => {
            tracing::warn!(coupon_code = code, error = %e, "Coupon lookup failed");
            return Err(CouponRejection::Unavailable);
        }
    };

    if coupon.is_expired_at(now) {
        return Err(CouponRejection::Expired);
    }

    if let Some(minimum) = coupon.minimum_purchase().filter(|&m| subtotal < m) {
        return Err(CouponRejection::MinimumNotMet { minimum });
    }

    match directory.check_coupon_usage(customer.id, coupon.id).await {
        Ok(false) => Ok(coupon),
        Ok(true) => Err(CouponRejection::AlreadyUsed),
        Err(e) => {
            tracing::warn!(coupon_code = code, error = %e, "Coupon usage check failed");
            Err(CouponRejection::Unavailable)
        }
    }
}
