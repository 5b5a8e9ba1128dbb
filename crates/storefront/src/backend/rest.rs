//! REST gateway backend.
//!
//! Talks to a Supabase-style gateway:
//!
//! - `auth/v1/*` - password sign-in, token refresh, user lookup, logout
//! - `rest/v1/*` - PostgREST reads from `employees`, `wholesale_clients`,
//!   `coupons` and `coupon_usage`
//!
//! The session is kept in local storage under
//! [`keys::AUTH_SESSION`](crate::storage::keys::AUTH_SESSION) so that it
//! survives restarts, the same way the browser SDK keeps its token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use phonestore_core::{
    Cnpj, CouponId, CustomerId, Email, EmployeeId, IdentityId, Permissions, StoreId,
    WholesaleClientId,
};

use super::{
    AuthError, AuthEvents, AuthProvider, AuthSubscription, BackendError, CouponDirectory,
    ProfileDirectory,
};
use crate::config::BackendConfig;
use crate::models::{AdminProfile, AuthEvent, Coupon, Identity, Session, WholesaleProfile};
use crate::storage::{LocalStore, keys, load_json, save_json};

/// Refresh tokens this long before they actually expire.
const EXPIRY_LEEWAY_SECONDS: i64 = 30;

const EMPLOYEE_COLUMNS: &str = "id,name,can_create,can_update,can_delete,store_id";
const WHOLESALE_COLUMNS: &str = "id,name,company_name,cnpj,store_id";
const COUPON_COLUMNS: &str =
    "id,code,discount_percent,active,valid_until,min_purchase_value,allowed_categories";

/// Client for the backend's auth and data APIs.
pub struct RestBackend {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    store: Arc<dyn LocalStore>,
    events: AuthEvents,
}

impl RestBackend {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the anon key is not a valid header value or
    /// the HTTP client fails to build.
    pub fn new(config: &BackendConfig, store: Arc<dyn LocalStore>) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.anon_key.expose_secret())
                .map_err(|e| BackendError::Parse(format!("Invalid anon key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
            store,
            events: AuthEvents::new(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Parse(format!("Invalid endpoint {path}: {e}")))
    }

    fn stored_session(&self) -> Result<Option<Session>, AuthError> {
        Ok(load_json(self.store.as_ref(), keys::AUTH_SESSION)?)
    }

    fn persist_session(&self, session: &Session) -> Result<(), AuthError> {
        save_json(self.store.as_ref(), keys::AUTH_SESSION, session)?;
        Ok(())
    }

    /// Bearer token for data requests: the user's if signed in, else the anon key.
    fn bearer(&self) -> String {
        match self.stored_session() {
            Ok(Some(session)) => session.access_token,
            _ => self.anon_key.expose_secret().to_owned(),
        }
    }

    // =========================================================================
    // Auth API
    // =========================================================================

    async fn token_grant(
        &self,
        grant_type: &str,
        body: serde_json::Value,
    ) -> Result<Session, AuthError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", grant_type);

        let response = self.client.post(url).json(&body).send().await?;
        let status = response.status();

        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let message = response.text().await.unwrap_or_default();
            tracing::debug!(grant_type, %status, %message, "Token grant rejected");
            return Err(if grant_type == "password" {
                AuthError::InvalidCredentials
            } else {
                AuthError::InvalidSession(message)
            });
        }

        let token: TokenResponse = read_json(response).await?;
        Ok(token.into_session())
    }

    async fn refresh(&self, session: &Session) -> Result<Session, AuthError> {
        let refreshed = self
            .token_grant(
                "refresh_token",
                serde_json::json!({ "refresh_token": session.refresh_token }),
            )
            .await?;
        self.persist_session(&refreshed)?;
        self.events.emit(AuthEvent::TokenRefreshed(refreshed.clone()));
        tracing::debug!(identity_id = %refreshed.identity.id, "Session refreshed");
        Ok(refreshed)
    }

    async fn fetch_user(&self, access_token: &str) -> Result<Identity, AuthError> {
        let response = self
            .client
            .get(self.endpoint("auth/v1/user")?)
            .bearer_auth(access_token)
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidSession(
                "access token rejected".to_string(),
            ));
        }

        let user: UserResponse = read_json(response).await?;
        Ok(user.into_identity())
    }

    // =========================================================================
    // Data API
    // =========================================================================

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, BackendError> {
        let mut url = self.endpoint(&format!("rest/v1/{table}"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("select", columns);
            for (column, value) in filters {
                query.append_pair(column, &format!("eq.{value}"));
            }
            query.append_pair("limit", "1");
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(self.bearer())
            .send()
            .await?;

        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, BackendError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(BackendError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| BackendError::Parse(e.to_string()))
}

#[async_trait]
impl AuthProvider for RestBackend {
    #[tracing::instrument(skip(self))]
    async fn get_current_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(session) = self.stored_session()? else {
            return Ok(None);
        };

        let deadline = Utc::now() + Duration::seconds(EXPIRY_LEEWAY_SECONDS);
        if session.is_expired_at(deadline) {
            return self.refresh(&session).await.map(Some);
        }

        let identity = self.fetch_user(&session.access_token).await?;
        let session = Session { identity, ..session };
        self.persist_session(&session)?;
        Ok(Some(session))
    }

    fn on_session_change(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    #[tracing::instrument(skip(self, password), fields(email = %email))]
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<Session, AuthError> {
        let session = self
            .token_grant(
                "password",
                serde_json::json!({
                    "email": email.as_str(),
                    "password": password.expose_secret(),
                }),
            )
            .await?;

        self.persist_session(&session)?;
        self.events.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    #[tracing::instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), AuthError> {
        let session = self.stored_session().ok().flatten();
        self.store.remove(keys::AUTH_SESSION)?;
        self.events.emit(AuthEvent::SignedOut);

        let Some(session) = session else {
            return Ok(());
        };

        let response = self
            .client
            .post(self.endpoint("auth/v1/logout")?)
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        // An already-revoked token is as good as a successful logout.
        let status = response.status();
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(BackendError::Api {
                status: status.as_u16(),
                message,
            }
            .into())
        }
    }
}

#[async_trait]
impl ProfileDirectory for RestBackend {
    #[tracing::instrument(skip(self))]
    async fn fetch_employee_profile(
        &self,
        identity_id: IdentityId,
    ) -> Result<Option<AdminProfile>, BackendError> {
        let rows: Vec<EmployeeRow> = self
            .select(
                "employees",
                EMPLOYEE_COLUMNS,
                &[("user_id", identity_id.to_string())],
            )
            .await?;
        Ok(rows.into_iter().next().map(AdminProfile::from))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_wholesale_profile(&self) -> Result<Option<WholesaleProfile>, BackendError> {
        let Some(session) = load_json::<Session>(self.store.as_ref(), keys::AUTH_SESSION)? else {
            return Ok(None);
        };

        let rows: Vec<WholesaleRow> = self
            .select(
                "wholesale_clients",
                WHOLESALE_COLUMNS,
                &[("user_id", session.identity.id.to_string())],
            )
            .await?;
        rows.into_iter()
            .next()
            .map(WholesaleProfile::try_from)
            .transpose()
    }
}

#[async_trait]
impl CouponDirectory for RestBackend {
    #[tracing::instrument(skip(self))]
    async fn fetch_coupon(&self, code: &str) -> Result<Option<Coupon>, BackendError> {
        let rows: Vec<Coupon> = self
            .select("coupons", COUPON_COLUMNS, &[("code", code.to_owned())])
            .await?;
        Ok(rows.into_iter().next())
    }

    #[tracing::instrument(skip(self))]
    async fn check_coupon_usage(
        &self,
        customer_id: CustomerId,
        coupon_id: CouponId,
    ) -> Result<bool, BackendError> {
        let rows: Vec<serde_json::Value> = self
            .select(
                "coupon_usage",
                "id",
                &[
                    ("customer_id", customer_id.to_string()),
                    ("coupon_id", coupon_id.to_string()),
                ],
            )
            .await?;
        Ok(!rows.is_empty())
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: UserResponse,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
            identity: self.user.into_identity(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: IdentityId,
    email: Option<String>,
    #[serde(default)]
    user_metadata: serde_json::Map<String, serde_json::Value>,
}

impl UserResponse {
    fn into_identity(self) -> Identity {
        let email = self.email.as_deref().and_then(|raw| {
            Email::parse(raw)
                .inspect_err(|e| tracing::warn!(identity_id = %self.id, "Ignoring invalid email: {e}"))
                .ok()
        });

        Identity {
            id: self.id,
            email,
            metadata: self.user_metadata,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmployeeRow {
    id: EmployeeId,
    name: String,
    #[serde(default)]
    can_create: bool,
    #[serde(default)]
    can_update: bool,
    #[serde(default)]
    can_delete: bool,
    store_id: Option<StoreId>,
}

impl From<EmployeeRow> for AdminProfile {
    fn from(row: EmployeeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            permissions: Permissions {
                can_create: row.can_create,
                can_update: row.can_update,
                can_delete: row.can_delete,
            },
            store_id: row.store_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WholesaleRow {
    id: WholesaleClientId,
    name: String,
    company_name: String,
    cnpj: String,
    store_id: StoreId,
}

impl TryFrom<WholesaleRow> for WholesaleProfile {
    type Error = BackendError;

    fn try_from(row: WholesaleRow) -> Result<Self, Self::Error> {
        let cnpj = Cnpj::parse(&row.cnpj).map_err(|e| {
            BackendError::DataCorruption(format!("invalid cnpj for wholesale client {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            company_name: row.company_name,
            cnpj,
            store_id: row.store_id,
        })
    }
}
