//! Durable local storage for client-side state.
//!
//! The storefront keeps a handful of JSON documents on the device: the cart,
//! the cached privileged profiles, and the auth session. The store is read
//! once when a component is constructed and written on every mutation.
//!
//! # Keys
//!
//! See [`keys`]. Each key holds one JSON document.
//!
//! # Consistency
//!
//! There is no cross-process coordination: two processes sharing a store
//! directory each hold their own in-memory state and the last writer wins.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Storage keys for persisted client state.
pub mod keys {
    /// Cached [`AdminProfile`](crate::models::AdminProfile) for optimistic rendering.
    pub const ADMIN_PROFILE: &str = "admin_profile";

    /// Cached [`WholesaleProfile`](crate::models::WholesaleProfile) for optimistic rendering.
    pub const WHOLESALE_PROFILE: &str = "wholesale_profile";

    /// Cart lines (JSON array of `CartLine`).
    pub const CART: &str = "cart";

    /// Auth session kept by the REST auth provider.
    pub const AUTH_SESSION: &str = "auth_session";
}

/// Errors that can occur when reading or writing local storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored document could not be (de)serialized.
    #[error("storage JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Key contains characters that are not allowed.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
}

/// A synchronous key/value store of JSON text.
///
/// Implementations must be safe to share between the session resolver and
/// the cart engine.
pub trait LocalStore: Send + Sync {
    /// Read the raw document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the document stored under `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing medium cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and deserialize the document stored under `key`.
///
/// # Errors
///
/// Returns `StorageError::Json` if the stored document does not match `T`.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn LocalStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    store
        .get(key)?
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(StorageError::from)
}

/// Serialize `value` and store it under `key`.
///
/// # Errors
///
/// Returns `StorageError` if serialization or the write fails.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn LocalStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// Validate a storage key: lowercase ASCII letters, digits and underscores.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_owned()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Doc {
        name: String,
        count: u32,
    }

    #[test]
    fn test_json_helpers() {
        let store = MemoryStore::new();
        let doc = Doc {
            name: "capinha".to_string(),
            count: 2,
        };

        save_json(&store, "doc", &doc).unwrap();
        let loaded: Option<Doc> = load_json(&store, "doc").unwrap();
        assert_eq!(loaded, Some(doc));

        let missing: Option<Doc> = load_json(&store, "missing").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_load_json_reports_corrupt_documents() {
        let store = MemoryStore::new();
        store.set("doc", "{not json").unwrap();
        let result: Result<Option<Doc>, _> = load_json(&store, "doc");
        assert!(matches!(result, Err(StorageError::Json(_))));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key(keys::ADMIN_PROFILE).is_ok());
        assert!(validate_key(keys::CART).is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("Cart").is_err());
    }
}
