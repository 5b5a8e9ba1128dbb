//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for front ends built on the storefront
//! core. Server-class errors are captured to Sentry before being reported to
//! the user.

use thiserror::Error;

use crate::backend::{AuthError, BackendError};
use crate::config::ConfigError;
use crate::services::cart::{CartError, CouponRejection};
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Backend request failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Cart mutation was rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Coupon was not applied.
    #[error("{0}")]
    Coupon(#[from] CouponRejection),

    /// The operation needs a signed-in user.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad input from the user.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The operation did not finish in time.
    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error points at a fault on our side rather than the user's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Backend(_) | Self::Storage(_) | Self::Internal(_) | Self::Timeout(_)
        ) || matches!(
            self,
            Self::Auth(AuthError::Backend(_) | AuthError::Storage(_))
        )
    }

    /// Report server-class errors to Sentry and the log.
    ///
    /// Returns the error unchanged so it can be used in a `map_err` chain.
    #[must_use]
    pub fn capture(self) -> Self {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Command error"
            );
        }
        self
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 78,
            Self::Auth(AuthError::Backend(_) | AuthError::Storage(_)) => 70,
            Self::Unauthorized(_) | Self::Auth(_) => 77,
            Self::BadRequest(_) | Self::Cart(_) | Self::Coupon(_) => 65,
            Self::Backend(_) | Self::Timeout(_) => 69,
            Self::Storage(_) => 74,
            Self::Internal(_) => 70,
        }
    }

    /// Message safe to show to the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(_) | Self::Timeout(_) => {
                "The store is unavailable right now, please try again".to_string()
            }
            Self::Storage(_) | Self::Internal(_) => "Internal error".to_string(),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid email or password".to_string(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::InvalidSession(_) => "Session expired, please sign in again".to_string(),
                AuthError::Backend(_) | AuthError::Storage(_) => {
                    "Authentication error".to_string()
                }
            },
            Self::Coupon(rejection) => rejection.to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");

        let err = AppError::Timeout(30);
        assert_eq!(err.to_string(), "Timed out after 30 seconds");
    }

    #[test]
    fn test_app_error_exit_codes() {
        assert_eq!(AppError::BadRequest("x".to_string()).exit_code(), 65);
        assert_eq!(AppError::Unauthorized("x".to_string()).exit_code(), 77);
        assert_eq!(AppError::Auth(AuthError::InvalidCredentials).exit_code(), 77);
        assert_eq!(AppError::Coupon(CouponRejection::LoginRequired).exit_code(), 65);
        assert_eq!(AppError::Timeout(5).exit_code(), 69);
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AppError::Backend(BackendError::Api {
            status: 500,
            message: "relation \"coupons\" does not exist".to_string(),
        });
        assert!(err.is_server_error());
        assert!(!err.user_message().contains("relation"));

        let err = AppError::Auth(AuthError::InvalidCredentials);
        assert!(!err.is_server_error());
        assert_eq!(err.user_message(), "Invalid email or password");
    }

    #[test]
    fn test_capture_without_sentry_is_noop() {
        let err = AppError::Internal("boom".to_string()).capture();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
