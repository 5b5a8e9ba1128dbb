//! Session and role resolution.
//!
//! Turns the identity behind an auth session into exactly one business role.
//! Privileged profiles are cached in local storage so a returning admin or
//! wholesale client renders immediately, before the backend has confirmed
//! anything.
//!
//! # Resolution order
//!
//! The employee lookup always runs first. If it finds a record the identity
//! is an admin and the wholesale lookup is skipped. Only then is the
//! wholesale lookup made. An identity with neither record is a retail
//! customer, derived from the session's metadata.
//!
//! # Failures
//!
//! A failed initial session check is trusted: the resolver logs out, even
//! if a cached profile exists. A failed profile lookup is not: the previous
//! profile and caches stay as they were.

use std::sync::Arc;

use secrecy::SecretString;

use phonestore_core::{Email, Role};

use crate::backend::{AuthError, AuthProvider, AuthSubscription, BackendError, ProfileDirectory};
use crate::error::{add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::models::{
    AdminProfile, AuthEvent, Identity, PrivilegedProfile, ResolvedProfile, RetailProfile, Session,
    WholesaleProfile,
};
use crate::storage::{LocalStore, keys, load_json, save_json};

/// Collaborators a [`SessionResolver`] works against.
#[derive(Clone)]
pub struct SessionContext {
    pub auth: Arc<dyn AuthProvider>,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub store: Arc<dyn LocalStore>,
}

/// Resolve the privileged role held by `identity`, if any.
///
/// Looks up the employee record first and stops there if one exists. The
/// wholesale lookup is scoped to the current session by the directory.
///
/// # Errors
///
/// Returns the first `BackendError` from either lookup.
#[tracing::instrument(skip_all, fields(identity_id = %identity.id))]
pub async fn resolve_role(
    identity: &Identity,
    directory: &dyn ProfileDirectory,
) -> Result<Option<PrivilegedProfile>, BackendError> {
    if let Some(admin) = directory.fetch_employee_profile(identity.id).await? {
        return Ok(Some(PrivilegedProfile::Admin(admin)));
    }

    Ok(directory
        .fetch_wholesale_profile()
        .await?
        .map(PrivilegedProfile::Wholesale))
}

/// Tracks the current session and the role resolved for it.
///
/// Events are handled one at a time through `&mut self`, so a resolution
/// always completes before the next one starts.
pub struct SessionResolver {
    ctx: SessionContext,
    session: Option<Session>,
    privileged: Option<PrivilegedProfile>,
    loading: bool,
    subscription: Option<AuthSubscription>,
}

impl SessionResolver {
    /// Create a resolver, restoring any cached privileged profile.
    ///
    /// `loading` starts `false` when a cached profile was found.
    #[must_use]
    pub fn new(ctx: SessionContext) -> Self {
        let privileged = read_cached_profile(ctx.store.as_ref());
        let loading = privileged.is_none();

        Self {
            ctx,
            session: None,
            privileged,
            loading,
            subscription: None,
        }
    }

    /// Subscribe to auth changes and run the initial session check.
    ///
    /// An error from the session check logs the user out.
    #[tracing::instrument(skip(self))]
    pub async fn initialize(&mut self) {
        self.subscription = Some(self.ctx.auth.on_session_change());

        match self.ctx.auth.get_current_session().await {
            Ok(session) => self.on_identity_change(session).await,
            Err(e) => {
                tracing::warn!(error = %e, "Initial session check failed, logging out");
                self.logout().await;
            }
        }

        self.loading = false;
    }

    /// Record a new session (or its absence) and resolve its role.
    pub async fn on_identity_change(&mut self, session: Option<Session>) {
        self.session = session;

        let Some(identity) = self.session.as_ref().map(|s| s.identity.clone()) else {
            clear_sentry_user();
            self.clear_profiles();
            return;
        };

        set_sentry_user(&identity.id, identity.email.as_ref().map(Email::as_str));
        self.resolve_profiles(&identity).await;
    }

    /// Apply one auth event.
    pub async fn handle_event(&mut self, event: AuthEvent) {
        tracing::debug!(?event, "Auth event");
        self.on_identity_change(event.into_session()).await;
    }

    /// Wait for the next auth event and apply it.
    ///
    /// Returns `false` once there is no subscription or the provider has
    /// gone away.
    pub async fn next_event(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };

        match subscription.recv().await {
            Some(event) => {
                self.handle_event(event).await;
                true
            }
            None => {
                self.subscription = None;
                false
            }
        }
    }

    /// Apply every auth event already delivered, without waiting for more.
    ///
    /// Returns the number of events applied.
    pub async fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let Some(event) = self.subscription.as_mut().and_then(AuthSubscription::try_recv)
            else {
                return applied;
            };
            self.handle_event(event).await;
            applied += 1;
        }
    }

    /// Stop listening for auth changes.
    pub fn teardown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    /// Resolve the role for `identity` and update the caches to match.
    ///
    /// A lookup failure is logged and leaves everything untouched.
    pub async fn resolve_profiles(&mut self, identity: &Identity) {
        let resolved = match resolve_role(identity, self.ctx.profiles.as_ref()).await {
            Ok(resolved) => resolved,
            Err(e) => {
                tracing::warn!(
                    identity_id = %identity.id,
                    error = %e,
                    "Profile lookup failed, keeping previous profile"
                );
                return;
            }
        };

        let store = self.ctx.store.as_ref();
        match &resolved {
            Some(PrivilegedProfile::Admin(admin)) => {
                cache_write(store, keys::ADMIN_PROFILE, admin);
                cache_remove(store, keys::WHOLESALE_PROFILE);
            }
            Some(PrivilegedProfile::Wholesale(wholesale)) => {
                cache_write(store, keys::WHOLESALE_PROFILE, wholesale);
                cache_remove(store, keys::ADMIN_PROFILE);
            }
            None => {
                cache_remove(store, keys::ADMIN_PROFILE);
                cache_remove(store, keys::WHOLESALE_PROFILE);
            }
        }

        let role = resolved
            .as_ref()
            .map_or(Role::Retail, PrivilegedProfile::role);
        tracing::info!(identity_id = %identity.id, %role, "Role resolved");
        add_breadcrumb("auth", "Role resolved", Some(&[("role", role.to_string().as_str())]));

        self.privileged = resolved;
    }

    /// Clear both profiles and caches, then end the auth session.
    ///
    /// A sign-out failure is logged; local state is cleared regardless.
    #[tracing::instrument(skip(self))]
    pub async fn logout(&mut self) {
        self.session = None;
        self.clear_profiles();

        if let Err(e) = self.ctx.auth.sign_out().await {
            tracing::warn!(error = %e, "Sign-out failed");
        }

        clear_sentry_user();
        self.loading = false;
        tracing::info!("Logged out");
    }

    /// Sign in with email and password.
    ///
    /// The session itself arrives through the auth event stream.
    ///
    /// # Errors
    ///
    /// Returns the provider's `AuthError` as-is.
    pub async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Session, AuthError> {
        self.ctx.auth.sign_in_with_password(email, password).await
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Whether the initial session check is still pending.
    #[must_use]
    pub const fn loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn privileged_profile(&self) -> Option<&PrivilegedProfile> {
        self.privileged.as_ref()
    }

    /// The profile to render.
    ///
    /// A cached privileged profile is returned even before the session check
    /// has finished.
    #[must_use]
    pub fn resolved_profile(&self) -> ResolvedProfile {
        if let Some(privileged) = &self.privileged {
            return privileged.clone().into();
        }
        self.session.as_ref().map_or(ResolvedProfile::None, |s| {
            ResolvedProfile::Retail(RetailProfile::from_identity(&s.identity))
        })
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        if let Some(privileged) = &self.privileged {
            return Some(privileged.role());
        }
        self.session.as_ref().map(|_| Role::Retail)
    }

    /// The signed-in retail customer, for coupon checks.
    ///
    /// `None` while loading and for admin or wholesale identities.
    #[must_use]
    pub fn retail_customer(&self) -> Option<RetailProfile> {
        if self.loading || self.privileged.is_some() {
            return None;
        }
        self.session
            .as_ref()
            .map(|s| RetailProfile::from_identity(&s.identity))
    }

    fn clear_profiles(&mut self) {
        self.privileged = None;
        let store = self.ctx.store.as_ref();
        cache_remove(store, keys::ADMIN_PROFILE);
        cache_remove(store, keys::WHOLESALE_PROFILE);
    }
}

/// Read the cached privileged profile. An unreadable cache counts as empty.
fn read_cached_profile(store: &dyn LocalStore) -> Option<PrivilegedProfile> {
    let admin = load_json::<AdminProfile>(store, keys::ADMIN_PROFILE)
        .inspect_err(|e| tracing::warn!(error = %e, "Ignoring unreadable admin profile cache"))
        .ok()
        .flatten();
    if let Some(admin) = admin {
        return Some(PrivilegedProfile::Admin(admin));
    }

    load_json::<WholesaleProfile>(store, keys::WHOLESALE_PROFILE)
        .inspect_err(|e| tracing::warn!(error = %e, "Ignoring unreadable wholesale profile cache"))
        .ok()
        .flatten()
        .map(PrivilegedProfile::Wholesale)
}

fn cache_write<T: serde::Serialize>(store: &dyn LocalStore, key: &str, value: &T) {
    if let Err(e) = save_json(store, key, value) {
        tracing::warn!(key, error = %e, "Failed to write profile cache");
    }
}

fn cache_remove(store: &dyn LocalStore, key: &str) {
    if let Err(e) = store.remove(key) {
        tracing::warn!(key, error = %e, "Failed to clear profile cache");
    }
}
