//! Sample checkout against an in-memory backend.
//!
//! Seeds a retail account and a 10% coupon, builds a cart, tries an
//! out-of-range quantity, signs in and applies the coupon. Nothing touches
//! the network or the data directory.

use std::sync::Arc;

use secrecy::SecretString;

use phonestore_core::{Cents, CouponId, Email, ProductId};
use phonestore_storefront::backend::AuthError;
use phonestore_storefront::backend::memory::MemoryBackend;
use phonestore_storefront::error::AppError;
use phonestore_storefront::models::{Coupon, DiscountPercent, ProductSnapshot};
use phonestore_storefront::services::{CartEngine, SessionContext, SessionResolver};
use phonestore_storefront::storage::MemoryStore;

use super::cart::CartReport;
use crate::output;

const DEMO_EMAIL: &str = "cliente@demo.phonestore";
const DEMO_PASSWORD: &str = "demo-password";
const DEMO_COUPON: &str = "SAVE10";

/// Run the sample checkout and print each step.
///
/// # Errors
///
/// Returns `AppError` if a step that should succeed does not.
pub async fn run() -> Result<(), AppError> {
    let backend = Arc::new(MemoryBackend::new());
    let store = Arc::new(MemoryStore::new());

    let email = Email::parse(DEMO_EMAIL).map_err(AuthError::from)?;
    let mut metadata = serde_json::Map::new();
    metadata.insert("name".to_string(), "Cliente Demo".into());
    backend.register_account(&email, DEMO_PASSWORD, metadata);
    backend.add_coupon(Coupon {
        id: CouponId::generate(),
        code: DEMO_COUPON.to_string(),
        discount_percent: DiscountPercent::new(10)
            .ok_or_else(|| AppError::Internal("bad demo discount".to_string()))?,
        active: true,
        valid_until: None,
        min_purchase_value: Some(100),
        allowed_categories: None,
    });

    let mut resolver = SessionResolver::new(SessionContext {
        auth: backend.clone(),
        profiles: backend.clone(),
        store: store.clone(),
    });
    resolver.initialize().await;

    let mut cart = CartEngine::new(store, backend);
    let phone = ProductSnapshot {
        product_id: ProductId::generate(),
        name: "Galaxy S24 Ultra".to_string(),
        unit_price: Cents::new(150_000),
        images: Vec::new(),
        category: "smartphones".to_string(),
        is_promotion: false,
        variant_id: None,
        variant_name: None,
    };
    let product_id = phone.product_id;
    for _ in 0..3 {
        cart.add_to_cart(phone.clone());
    }
    output::line(&format!("Added 3 x {} ({})", phone.name, phone.unit_price));

    if let Err(e) = cart.update_quantity(product_id, 7) {
        output::line(&format!("Rejected update: {e}"));
    }

    match cart.apply_coupon(DEMO_COUPON, resolver.retail_customer().as_ref()).await {
        Ok(_) => output::line("Coupon applied before sign-in"),
        Err(rejection) => output::line(&format!("Before sign-in: {rejection}")),
    }

    resolver
        .sign_in(&email, &SecretString::from(DEMO_PASSWORD))
        .await?;
    resolver.drain_events().await;
    resolver.teardown();

    let customer = resolver.retail_customer();
    let coupon = cart.apply_coupon(DEMO_COUPON, customer.as_ref()).await?;
    output::line(&format!(
        "Applied {} ({}% off)",
        coupon.code,
        coupon.discount_percent.get()
    ));

    output::json(&CartReport::of(&cart))
}
