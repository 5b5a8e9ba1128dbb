//! Collaborator interfaces for the managed backend.
//!
//! The storefront core never talks to the network directly. It depends on
//! three narrow traits, injected as `Arc<dyn _>`:
//!
//! - [`AuthProvider`] - sessions, sign-in/sign-out and change notifications
//! - [`ProfileDirectory`] - employee and wholesale-client lookups
//! - [`CouponDirectory`] - coupon lookup and single-use checks
//!
//! # Implementations
//!
//! - [`rest::RestBackend`] - Supabase-style REST gateway (auth + PostgREST)
//! - [`memory::MemoryBackend`] - in-process backend for tests and demos

mod error;
mod events;
pub mod memory;
pub mod rest;

pub use error::{AuthError, BackendError};
pub use events::{AuthEvents, AuthSubscription};

use async_trait::async_trait;
use secrecy::SecretString;

use phonestore_core::{CouponId, CustomerId, Email, IdentityId};

use crate::models::{AdminProfile, Coupon, Session, WholesaleProfile};

/// The external authentication provider.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The current session, if any.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the stored session is invalid or cannot be
    /// verified. Callers must not trust a session that failed this check.
    async fn get_current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Subscribe to sign-in, sign-out and token-refresh events.
    fn on_session_change(&self) -> AuthSubscription;

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for a wrong email/password pair.
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Session, AuthError>;

    /// End the current session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the provider could not be told about the sign-out.
    /// The local session is discarded either way.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Lookups backing role resolution.
#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// The employee record linked to `identity_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on network or decoding failure.
    async fn fetch_employee_profile(
        &self,
        identity_id: IdentityId,
    ) -> Result<Option<AdminProfile>, BackendError>;

    /// The wholesale-client record of whoever holds the current session.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on network or decoding failure.
    async fn fetch_wholesale_profile(&self) -> Result<Option<WholesaleProfile>, BackendError>;
}

/// Lookups backing coupon validation.
#[async_trait]
pub trait CouponDirectory: Send + Sync {
    /// The coupon with exactly this code, if any.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on network or decoding failure.
    async fn fetch_coupon(&self, code: &str) -> Result<Option<Coupon>, BackendError>;

    /// Whether `customer_id` has already redeemed `coupon_id`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` on network or decoding failure.
    async fn check_coupon_usage(
        &self,
        customer_id: CustomerId,
        coupon_id: CouponId,
    ) -> Result<bool, BackendError>;
}
