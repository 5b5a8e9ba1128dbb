//! Backend and authentication error types.

use thiserror::Error;

use crate::storage::StorageError;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A record came back with invalid data (e.g. a malformed CNPJ).
    #[error("Data corruption: {0}")]
    DataCorruption(String),

    /// The backend could not be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Local state needed for the request could not be read.
    #[error("Local storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] phonestore_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The stored session was rejected or could not be refreshed.
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// Session could not be read from or written to local storage.
    #[error("session storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Backend(BackendError::Http(err))
    }
}
