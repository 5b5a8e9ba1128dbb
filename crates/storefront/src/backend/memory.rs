//! In-process backend.
//!
//! Implements every collaborator trait over plain maps. Lookups are counted
//! and failures can be switched on, so callers can check which calls were
//! made and how errors are handled without a network.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use phonestore_core::{CouponId, CustomerId, Email, IdentityId};

use super::{
    AuthError, AuthEvents, AuthProvider, AuthSubscription, BackendError, CouponDirectory,
    ProfileDirectory,
};
use crate::models::{AdminProfile, AuthEvent, Coupon, Identity, Session, WholesaleProfile};

/// Lifetime of sessions issued by the memory backend.
const SESSION_TTL_MINUTES: i64 = 60;

#[derive(Default)]
struct State {
    accounts: HashMap<Email, (String, Identity)>,
    session: Option<Session>,
    employees: HashMap<IdentityId, AdminProfile>,
    wholesale_clients: HashMap<IdentityId, WholesaleProfile>,
    coupons: HashMap<String, Coupon>,
    redemptions: HashSet<(CustomerId, CouponId)>,
    fail_session_check: bool,
    fail_profile_lookups: bool,
    fail_coupon_lookups: bool,
}

/// Number of collaborator calls served, per lookup.
#[derive(Debug, Default)]
struct Counters {
    employee_lookups: AtomicUsize,
    wholesale_lookups: AtomicUsize,
    coupon_lookups: AtomicUsize,
    usage_checks: AtomicUsize,
}

/// Backend kept entirely in memory.
#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
    counters: Counters,
    events: AuthEvents,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Register an account that can sign in with `password`.
    pub fn register_account(
        &self,
        email: &Email,
        password: &str,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Identity {
        let identity = Identity {
            id: IdentityId::generate(),
            email: Some(email.clone()),
            metadata,
        };
        self.state()
            .accounts
            .insert(email.clone(), (password.to_owned(), identity.clone()));
        identity
    }

    /// Link an employee record to `identity_id`.
    pub fn add_employee(&self, identity_id: IdentityId, profile: AdminProfile) {
        self.state().employees.insert(identity_id, profile);
    }

    /// Link a wholesale-client record to `identity_id`.
    pub fn add_wholesale_client(&self, identity_id: IdentityId, profile: WholesaleProfile) {
        self.state().wholesale_clients.insert(identity_id, profile);
    }

    /// Make a coupon available under its code.
    pub fn add_coupon(&self, coupon: Coupon) {
        self.state().coupons.insert(coupon.code.clone(), coupon);
    }

    /// Record that a customer has redeemed a coupon.
    pub fn record_redemption(&self, customer_id: CustomerId, coupon_id: CouponId) {
        self.state().redemptions.insert((customer_id, coupon_id));
    }

    /// Install a session directly, as if restored from a previous visit.
    pub fn restore_session(&self, session: Session) {
        self.state().session = Some(session);
    }

    /// Issue a fresh session for `identity` without emitting an event.
    #[must_use]
    pub fn issue_session(identity: Identity) -> Session {
        Session {
            access_token: Uuid::new_v4().to_string(),
            refresh_token: Uuid::new_v4().to_string(),
            expires_at: Utc::now() + Duration::minutes(SESSION_TTL_MINUTES),
            identity,
        }
    }

    /// Rotate the current session's tokens and emit `TokenRefreshed`.
    pub fn refresh_session(&self) -> Option<Session> {
        let refreshed = {
            let mut state = self.state();
            let identity = state.session.as_ref()?.identity.clone();
            let session = Self::issue_session(identity);
            state.session = Some(session.clone());
            session
        };
        self.events.emit(AuthEvent::TokenRefreshed(refreshed.clone()));
        Some(refreshed)
    }

    // =========================================================================
    // Failure injection
    // =========================================================================

    /// Make `get_current_session` fail.
    pub fn fail_session_check(&self, fail: bool) {
        self.state().fail_session_check = fail;
    }

    /// Make both profile lookups fail.
    pub fn fail_profile_lookups(&self, fail: bool) {
        self.state().fail_profile_lookups = fail;
    }

    /// Make coupon lookups and usage checks fail.
    pub fn fail_coupon_lookups(&self, fail: bool) {
        self.state().fail_coupon_lookups = fail;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// The session the backend currently considers active.
    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.state().session.clone()
    }

    #[must_use]
    pub fn employee_lookups(&self) -> usize {
        self.counters.employee_lookups.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn wholesale_lookups(&self) -> usize {
        self.counters.wholesale_lookups.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn coupon_lookups(&self) -> usize {
        self.counters.coupon_lookups.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn usage_checks(&self) -> usize {
        self.counters.usage_checks.load(Ordering::SeqCst)
    }
}

fn unavailable(what: &str) -> BackendError {
    BackendError::Unavailable(format!("{what} lookup failed"))
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn get_current_session(&self) -> Result<Option<Session>, AuthError> {
        let state = self.state();
        if state.fail_session_check {
            return Err(AuthError::InvalidSession("session check failed".to_string()));
        }
        Ok(state.session.clone())
    }

    fn on_session_change(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Session, AuthError> {
        let session = {
            let mut state = self.state();
            let identity = match state.accounts.get(email) {
                Some((stored, identity)) if stored == password.expose_secret() => identity.clone(),
                _ => return Err(AuthError::InvalidCredentials),
            };
            let session = Self::issue_session(identity);
            state.session = Some(session.clone());
            session
        };
        self.events.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let had_session = self.state().session.take().is_some();
        if had_session {
            self.events.emit(AuthEvent::SignedOut);
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileDirectory for MemoryBackend {
    async fn fetch_employee_profile(
        &self,
        identity_id: IdentityId,
    ) -> Result<Option<AdminProfile>, BackendError> {
        self.counters.employee_lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        if state.fail_profile_lookups {
            return Err(unavailable("employee"));
        }
        Ok(state.employees.get(&identity_id).cloned())
    }

    async fn fetch_wholesale_profile(&self) -> Result<Option<WholesaleProfile>, BackendError> {
        self.counters.wholesale_lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        if state.fail_profile_lookups {
            return Err(unavailable("wholesale"));
        }
        let Some(session) = state.session.as_ref() else {
            return Ok(None);
        };
        Ok(state.wholesale_clients.get(&session.identity.id).cloned())
    }
}

#[async_trait]
impl CouponDirectory for MemoryBackend {
    async fn fetch_coupon(&self, code: &str) -> Result<Option<Coupon>, BackendError> {
        self.counters.coupon_lookups.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        if state.fail_coupon_lookups {
            return Err(unavailable("coupon"));
        }
        Ok(state.coupons.get(code).cloned())
    }

    async fn check_coupon_usage(
        &self,
        customer_id: CustomerId,
        coupon_id: CouponId,
    ) -> Result<bool, BackendError> {
        self.counters.usage_checks.fetch_add(1, Ordering::SeqCst);
        let state = self.state();
        if state.fail_coupon_lookups {
            return Err(unavailable("coupon usage"));
        }
        Ok(state.redemptions.contains(&(customer_id, coupon_id)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::parse("dani@exemplo.com").unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_emits_and_stores_session() {
        let backend = MemoryBackend::new();
        let identity = backend.register_account(&email(), "s3nha-forte", serde_json::Map::new());
        let mut sub = backend.on_session_change();

        let session = backend
            .sign_in_with_password(&email(), &SecretString::from("s3nha-forte"))
            .await
            .unwrap();

        assert_eq!(session.identity, identity);
        assert_eq!(backend.current_session(), Some(session.clone()));
        assert_eq!(sub.recv().await, Some(AuthEvent::SignedIn(session)));
    }

    #[tokio::test]
    async fn test_wrong_password_is_invalid_credentials() {
        let backend = MemoryBackend::new();
        backend.register_account(&email(), "s3nha-forte", serde_json::Map::new());

        let result = backend
            .sign_in_with_password(&email(), &SecretString::from("errada"))
            .await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert!(backend.current_session().is_none());
    }

    #[tokio::test]
    async fn test_wholesale_lookup_is_scoped_to_session() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.fetch_wholesale_profile().await.unwrap(), None);
        assert_eq!(backend.wholesale_lookups(), 1);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let backend = MemoryBackend::new();
        backend.fail_coupon_lookups(true);
        assert!(backend.fetch_coupon("X").await.is_err());
        backend.fail_coupon_lookups(false);
        assert_eq!(backend.fetch_coupon("X").await.unwrap(), None);
        assert_eq!(backend.coupon_lookups(), 2);
    }
}
