//! Command implementations.

pub mod cart;
pub mod demo;
pub mod session;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use phonestore_storefront::backend::rest::RestBackend;
use phonestore_storefront::config::StorefrontConfig;
use phonestore_storefront::error::AppError;
use phonestore_storefront::services::{CartEngine, SessionContext, SessionResolver};
use phonestore_storefront::storage::FileStore;

/// Collaborators shared by every command.
pub struct App {
    backend: Arc<RestBackend>,
    store: Arc<FileStore>,
    timeout: Duration,
}

impl App {
    /// Open the local store and build the backend client.
    ///
    /// # Errors
    ///
    /// Returns `AppError` if the data directory cannot be created or the
    /// HTTP client fails to build.
    pub fn new(config: &StorefrontConfig) -> Result<Self, AppError> {
        let store = Arc::new(FileStore::open(&config.data_dir)?);
        let backend = Arc::new(RestBackend::new(&config.backend, store.clone())?);
        tracing::debug!(data_dir = %config.data_dir.display(), "Storefront ready");

        Ok(Self {
            backend,
            store,
            timeout: config.request_timeout,
        })
    }

    #[must_use]
    pub fn session_resolver(&self) -> SessionResolver {
        SessionResolver::new(SessionContext {
            auth: self.backend.clone(),
            profiles: self.backend.clone(),
            store: self.store.clone(),
        })
    }

    #[must_use]
    pub fn cart(&self) -> CartEngine {
        CartEngine::new(self.store.clone(), self.backend.clone())
    }

    /// Run `fut`, giving up after the configured request timeout.
    pub async fn bounded<T>(
        &self,
        fut: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| AppError::Timeout(self.timeout.as_secs()))?
    }
}
