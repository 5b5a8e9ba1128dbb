//! Session commands.
//!
//! # Usage
//!
//! ```bash
//! ps-cli session login -e cliente@loja.com -p 's3nha'
//! ps-cli session whoami
//! ps-cli session logout
//! ```

use secrecy::SecretString;
use serde::Serialize;

use phonestore_core::Email;
use phonestore_storefront::backend::AuthError;
use phonestore_storefront::error::AppError;
use phonestore_storefront::models::ResolvedProfile;
use phonestore_storefront::services::SessionResolver;

use super::App;
use crate::output;

/// What `whoami` reports: `loading`, then `role` and `profile`.
#[derive(Debug, Serialize)]
pub struct Whoami {
    pub loading: bool,
    #[serde(flatten)]
    pub profile: ResolvedProfile,
}

impl Whoami {
    #[must_use]
    pub fn of(resolver: &SessionResolver) -> Self {
        Self {
            loading: resolver.loading(),
            profile: resolver.resolved_profile(),
        }
    }
}

/// Sign in and print the resolved role.
///
/// # Errors
///
/// Returns `AppError::Auth` for a malformed email or rejected credentials.
pub async fn login(app: &App, email: &str, password: String) -> Result<(), AppError> {
    let email = Email::parse(email).map_err(AuthError::from)?;
    let password = SecretString::from(password);

    let mut resolver = app.session_resolver();
    resolver.initialize().await;
    resolver.sign_in(&email, &password).await?;
    resolver.drain_events().await;
    resolver.teardown();

    tracing::info!(email = %email, "Signed in");
    output::json(&Whoami::of(&resolver))
}

/// Sign out and clear cached profiles.
///
/// # Errors
///
/// Never fails; sign-out problems are logged.
pub async fn logout(app: &App) -> Result<(), AppError> {
    let mut resolver = app.session_resolver();
    resolver.initialize().await;
    resolver.logout().await;
    resolver.teardown();

    output::line("Signed out");
    Ok(())
}

/// Print the current role and profile.
///
/// # Errors
///
/// Returns `AppError::Internal` if the report cannot be rendered.
pub async fn whoami(app: &App) -> Result<(), AppError> {
    let mut resolver = app.session_resolver();
    resolver.initialize().await;
    resolver.teardown();

    output::json(&Whoami::of(&resolver))
}
