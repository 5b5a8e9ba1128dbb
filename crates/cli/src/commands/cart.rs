//! Cart commands.
//!
//! The cart lives in the local data directory. Coupons are validated against
//! the backend each time `totals --coupon` runs and are never stored.

use serde::Serialize;

use phonestore_core::{Cents, ProductId, VariantId};
use phonestore_storefront::error::AppError;
use phonestore_storefront::models::{CartLine, CartTotals, ProductSnapshot};
use phonestore_storefront::services::CartEngine;

use super::App;
use crate::output;

/// Product details given on the command line.
pub struct NewItem {
    pub product_id: ProductId,
    pub name: String,
    pub price_cents: i64,
    pub category: String,
    pub variant_id: Option<VariantId>,
    pub variant_name: Option<String>,
    pub is_promotion: bool,
    pub images: Vec<String>,
}

impl NewItem {
    fn into_snapshot(self) -> Result<ProductSnapshot, AppError> {
        if self.price_cents < 0 {
            return Err(AppError::BadRequest("price cannot be negative".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("product name is required".to_string()));
        }

        Ok(ProductSnapshot {
            product_id: self.product_id,
            name: self.name,
            unit_price: Cents::new(self.price_cents),
            images: self.images,
            category: self.category,
            is_promotion: self.is_promotion,
            variant_id: self.variant_id,
            variant_name: self.variant_name,
        })
    }
}

/// Cart contents as printed by `show` and `totals`.
#[derive(Debug, Serialize)]
pub struct CartReport<'a> {
    pub lines: &'a [CartLine],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon: Option<&'a str>,
    #[serde(flatten)]
    pub totals: CartTotals,
}

impl<'a> CartReport<'a> {
    #[must_use]
    pub fn of(cart: &'a CartEngine) -> Self {
        Self {
            lines: cart.lines(),
            coupon: cart.applied_coupon().map(|c| c.code.as_str()),
            totals: cart.totals(),
        }
    }
}

/// Add one unit of a product.
///
/// # Errors
///
/// Returns `AppError::BadRequest` for a negative price or blank name.
pub fn add(app: &App, item: NewItem) -> Result<(), AppError> {
    let mut cart = app.cart();
    let quantity = cart.add_to_cart(item.into_snapshot()?);
    output::line(&format!("Quantity now {quantity}"));
    Ok(())
}

/// Remove a product's line.
///
/// # Errors
///
/// Never fails; removing an unknown product is a no-op.
pub fn remove(app: &App, product_id: ProductId) -> Result<(), AppError> {
    let mut cart = app.cart();
    if cart.remove_from_cart(product_id) {
        output::line("Removed");
    } else {
        output::line("Not in cart");
    }
    Ok(())
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns `AppError::Cart` for an out-of-range quantity or unknown product.
pub fn update(app: &App, product_id: ProductId, quantity: u32) -> Result<(), AppError> {
    let mut cart = app.cart();
    cart.update_quantity(product_id, quantity)?;
    output::line(&format!("Quantity now {quantity}"));
    Ok(())
}

/// Empty the cart.
///
/// # Errors
///
/// Never fails.
pub fn clear(app: &App) -> Result<(), AppError> {
    app.cart().clear_cart();
    output::line("Cart cleared");
    Ok(())
}

/// Print the cart's lines and totals.
///
/// # Errors
///
/// Returns `AppError::Internal` if the report cannot be rendered.
pub fn show(app: &App) -> Result<(), AppError> {
    let cart = app.cart();
    output::json(&CartReport::of(&cart))
}

/// Print the totals, applying `coupon` first if given.
///
/// The coupon is checked for the signed-in retail customer.
///
/// # Errors
///
/// Returns `AppError::Coupon` if the coupon is rejected.
pub async fn totals(app: &App, coupon: Option<&str>) -> Result<(), AppError> {
    let mut cart = app.cart();

    if let Some(code) = coupon {
        let mut resolver = app.session_resolver();
        resolver.initialize().await;
        resolver.teardown();

        let customer = resolver.retail_customer();
        cart.apply_coupon(code, customer.as_ref()).await?;
    }

    output::json(&CartReport::of(&cart))
}
