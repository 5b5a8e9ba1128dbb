//! Integration tests for phonestore.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p phonestore-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session_resolution` - Role resolution, profile caches, logout paths
//! - `cart_checkout` - Cart quantities, pricing and coupon validation
//! - `rest_backend` - The REST adapter against a local gateway stub
//!
//! The service suites run against the in-memory backend and store. The REST
//! suite binds an axum server on `127.0.0.1`; no external network or
//! database is needed.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use phonestore_core::{
    Cents, Cnpj, CouponId, CustomerId, Email, EmployeeId, Permissions, ProductId, StoreId,
    WholesaleClientId,
};
use phonestore_storefront::backend::memory::MemoryBackend;
use phonestore_storefront::models::{
    AdminProfile, Coupon, DiscountPercent, ProductSnapshot, RetailProfile, Session,
    WholesaleProfile,
};
use phonestore_storefront::services::{CartEngine, SessionContext, SessionResolver};
use phonestore_storefront::storage::{LocalStore, MemoryStore};

/// A backend and store shared by the services under test.
pub struct TestContext {
    pub backend: Arc<MemoryBackend>,
    pub store: Arc<MemoryStore>,
}

impl TestContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: Arc::new(MemoryBackend::new()),
            store: Arc::new(MemoryStore::new()),
        }
    }

    #[must_use]
    pub fn resolver(&self) -> SessionResolver {
        resolver_with_store(&self.backend, self.store.clone())
    }

    #[must_use]
    pub fn cart(&self) -> CartEngine {
        CartEngine::new(self.store.clone(), self.backend.clone())
    }

    /// Register an account and install a session for it, as if the user had
    /// signed in during an earlier visit.
    ///
    /// # Panics
    ///
    /// Panics if `email` is not a valid address.
    pub fn restore_session(&self, email: &str) -> Session {
        let email = Email::parse(email).expect("valid test email");
        let identity = self
            .backend
            .register_account(&email, "pw", serde_json::Map::new());
        let session = MemoryBackend::issue_session(identity);
        self.backend.restore_session(session.clone());
        session
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// A resolver over `backend` with a caller-chosen store.
#[must_use]
pub fn resolver_with_store(
    backend: &Arc<MemoryBackend>,
    store: Arc<dyn LocalStore>,
) -> SessionResolver {
    SessionResolver::new(SessionContext {
        auth: backend.clone(),
        profiles: backend.clone(),
        store,
    })
}

#[must_use]
pub fn admin_profile(name: &str) -> AdminProfile {
    AdminProfile {
        id: EmployeeId::generate(),
        name: name.to_string(),
        permissions: Permissions::FULL,
        store_id: Some(StoreId::generate()),
    }
}

/// A wholesale client with a fixed, valid CNPJ.
///
/// # Panics
///
/// Panics if the fixed CNPJ stops parsing.
#[must_use]
pub fn wholesale_profile(company: &str) -> WholesaleProfile {
    WholesaleProfile {
        id: WholesaleClientId::generate(),
        name: "Comprador".to_string(),
        company_name: company.to_string(),
        cnpj: Cnpj::parse("11.222.333/0001-81").expect("valid test cnpj"),
        store_id: StoreId::generate(),
    }
}

#[must_use]
pub fn retail_customer() -> RetailProfile {
    RetailProfile {
        id: CustomerId::generate(),
        name: "Cliente".to_string(),
        phone: Some("+55 11 91234-5678".to_string()),
        email: None,
    }
}

#[must_use]
pub fn product(name: &str, price_cents: i64) -> ProductSnapshot {
    ProductSnapshot {
        product_id: ProductId::generate(),
        name: name.to_string(),
        unit_price: Cents::new(price_cents),
        images: vec![format!("https://cdn.phonestore.test/{}.webp", name.to_lowercase())],
        category: "smartphones".to_string(),
        is_promotion: false,
        variant_id: None,
        variant_name: None,
    }
}

/// An active coupon with no expiry, minimum or category list.
///
/// # Panics
///
/// Panics if `percent` is above 100.
#[must_use]
pub fn coupon(code: &str, percent: u8) -> Coupon {
    Coupon {
        id: CouponId::generate(),
        code: code.to_string(),
        discount_percent: DiscountPercent::new(percent).expect("percent within 0..=100"),
        active: true,
        valid_until: None,
        min_purchase_value: None,
        allowed_categories: None,
    }
}

/// `coupon` with an expiry.
#[must_use]
pub fn expiring_coupon(code: &str, percent: u8, valid_until: DateTime<Utc>) -> Coupon {
    Coupon {
        valid_until: Some(valid_until),
        ..coupon(code, percent)
    }
}
