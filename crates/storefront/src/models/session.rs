//! Session-related types.
//!
//! The auth provider owns identities and sessions; the storefront only
//! observes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use phonestore_core::{Email, IdentityId};

/// An authenticated principal as issued by the auth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned identity ID.
    pub id: IdentityId,
    /// Sign-in email, when the provider has one.
    pub email: Option<Email>,
    /// Free-form profile data entered at sign-up (`name`, `phone`, ...).
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Identity {
    /// Read a non-empty string value from the metadata bag.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// An auth session: bearer tokens plus the identity they belong to.
///
/// Implements `Debug` manually to redact the tokens.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub identity: Identity,
}

impl Session {
    /// Whether the access token has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("identity", &self.identity)
            .finish()
    }
}

/// A transition observed on the auth provider's change subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

impl AuthEvent {
    /// The session carried by the event, if any.
    #[must_use]
    pub fn into_session(self) -> Option<Session> {
        match self {
            Self::SignedIn(session) | Self::TokenRefreshed(session) => Some(session),
            Self::SignedOut => None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn session() -> Session {
        Session {
            access_token: "access-token-value".to_string(),
            refresh_token: "refresh-token-value".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
            identity: Identity {
                id: IdentityId::generate(),
                email: Some(Email::parse("ana@loja.com").unwrap()),
                metadata: serde_json::Map::new(),
            },
        }
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let debug_output = format!("{:?}", session());
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("access-token-value"));
        assert!(!debug_output.contains("refresh-token-value"));
        assert!(debug_output.contains("ana@loja.com"));
    }

    #[test]
    fn test_expiry() {
        let s = session();
        assert!(!s.is_expired_at(Utc::now()));
        assert!(s.is_expired_at(s.expires_at));
    }

    #[test]
    fn test_metadata_str_ignores_blank_and_non_string() {
        let mut s = session();
        s.identity
            .metadata
            .insert("name".into(), serde_json::json!("  Ana Souza "));
        s.identity.metadata.insert("phone".into(), serde_json::json!(""));
        s.identity.metadata.insert("age".into(), serde_json::json!(31));

        assert_eq!(s.identity.metadata_str("name"), Some("Ana Souza"));
        assert_eq!(s.identity.metadata_str("phone"), None);
        assert_eq!(s.identity.metadata_str("age"), None);
    }

    #[test]
    fn test_event_session() {
        let s = session();
        assert_eq!(AuthEvent::SignedIn(s.clone()).into_session(), Some(s));
        assert_eq!(AuthEvent::SignedOut.into_session(), None);
    }
}
