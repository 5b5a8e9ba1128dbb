//! Cart contents, pricing and coupon application.
//!
//! Lines are kept in local storage and written back on every mutation. The
//! applied coupon lives only in memory: after a restart it has to be applied
//! again, through the same checks.
//!
//! Totals are derived on every call and never stored.

mod coupon;

pub use coupon::{CouponRejection, validate_coupon};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use phonestore_core::{Cents, ProductId};

use crate::backend::CouponDirectory;
use crate::error::add_breadcrumb;
use crate::models::{CartLine, CartTotals, Coupon, ProductSnapshot, RetailProfile};
use crate::storage::{LocalStore, keys, load_json, save_json};

/// Errors from cart mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be between 1 and 5, got {0}")]
    QuantityOutOfRange(u32),

    #[error("product {0} is not in the cart")]
    LineNotFound(ProductId),
}

/// The shopper's cart.
pub struct CartEngine {
    store: Arc<dyn LocalStore>,
    coupons: Arc<dyn CouponDirectory>,
    lines: Vec<CartLine>,
    applied_coupon: Option<Coupon>,
}

impl CartEngine {
    /// Create the engine, restoring lines from local storage.
    ///
    /// An unreadable cart starts empty. Lines with a quantity outside the
    /// allowed range are dropped.
    #[must_use]
    pub fn new(store: Arc<dyn LocalStore>, coupons: Arc<dyn CouponDirectory>) -> Self {
        let lines = match load_json::<Vec<CartLine>>(store.as_ref(), keys::CART) {
            Ok(lines) => lines.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable cart");
                Vec::new()
            }
        };

        let restored = lines.len();
        let lines: Vec<CartLine> = lines
            .into_iter()
            .filter(|line| CartLine::quantity_in_range(line.quantity))
            .collect();
        if lines.len() < restored {
            tracing::warn!(
                dropped = restored - lines.len(),
                "Dropped cart lines with out-of-range quantities"
            );
        }

        Self {
            store,
            coupons,
            lines,
            applied_coupon: None,
        }
    }

    // =========================================================================
    // Lines
    // =========================================================================

    /// Add one unit of `product`.
    ///
    /// A product already in the cart gains one unit, up to the maximum.
    /// Beyond that the call changes nothing. Returns the line's quantity.
    pub fn add_to_cart(&mut self, product: ProductSnapshot) -> u32 {
        let product_id = product.product_id;

        let quantity = if let Some(line) = self.line_mut(product_id) {
            line.quantity = (line.quantity + 1).min(CartLine::MAX_QUANTITY);
            line.quantity
        } else {
            self.lines.push(CartLine {
                product,
                quantity: CartLine::MIN_QUANTITY,
            });
            CartLine::MIN_QUANTITY
        };

        tracing::debug!(%product_id, quantity, "Added to cart");
        add_breadcrumb(
            "cart",
            "Added to cart",
            Some(&[("product_id", product_id.to_string().as_str())]),
        );
        self.persist();
        quantity
    }

    /// Remove a product's line. Returns whether it was in the cart.
    pub fn remove_from_cart(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|line| line.product.product_id != product_id);
        let removed = self.lines.len() < before;

        if removed {
            tracing::debug!(%product_id, "Removed from cart");
            self.persist();
        }
        removed
    }

    /// Set a line's quantity.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityOutOfRange` for a quantity outside 1..=5
    /// (zero included) and `CartError::LineNotFound` for a product not in
    /// the cart. The cart is unchanged in both cases.
    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), CartError> {
        if !CartLine::quantity_in_range(quantity) {
            return Err(CartError::QuantityOutOfRange(quantity));
        }

        let line = self
            .line_mut(product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        line.quantity = quantity;

        tracing::debug!(%product_id, quantity, "Quantity updated");
        self.persist();
        Ok(())
    }

    /// Empty the cart and detach any coupon.
    pub fn clear_cart(&mut self) {
        self.lines.clear();
        self.applied_coupon = None;
        tracing::debug!("Cart cleared");
        self.persist();
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// Validate `code` and apply it as the cart's coupon.
    ///
    /// # Errors
    ///
    /// Returns the `CouponRejection` from the first failing check. A
    /// rejection leaves any previously applied coupon in place.
    pub async fn apply_coupon(
        &mut self,
        code: &str,
        customer: Option<&RetailProfile>,
    ) -> Result<&Coupon, CouponRejection> {
        self.apply_coupon_at(code, customer, Utc::now()).await
    }

    /// [`apply_coupon`](Self::apply_coupon) with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`apply_coupon`](Self::apply_coupon).
    pub async fn apply_coupon_at(
        &mut self,
        code: &str,
        customer: Option<&RetailProfile>,
        now: DateTime<Utc>,
    ) -> Result<&Coupon, CouponRejection> {
        let subtotal = self.subtotal();
        let outcome = validate_coupon(self.coupons.as_ref(), code, customer, subtotal, now).await;

        match outcome {
            Ok(coupon) => {
                tracing::info!(
                    coupon_code = %coupon.code,
                    discount_percent = coupon.discount_percent.get(),
                    subtotal_cents = subtotal.as_i64(),
                    "Coupon applied"
                );
                add_breadcrumb(
                    "coupon",
                    "Coupon applied",
                    Some(&[("coupon_code", coupon.code.as_str())]),
                );
                Ok(self.applied_coupon.insert(coupon))
            }
            Err(rejection) => {
                tracing::info!(
                    coupon_code = code.trim(),
                    reason = rejection.reason(),
                    subtotal_cents = subtotal.as_i64(),
                    "Coupon rejected"
                );
                add_breadcrumb(
                    "coupon",
                    "Coupon rejected",
                    Some(&[("coupon_code", code.trim()), ("reason", rejection.reason())]),
                );
                Err(rejection)
            }
        }
    }

    /// Detach the applied coupon, if any. Lines are untouched.
    pub fn remove_coupon(&mut self) {
        if let Some(coupon) = self.applied_coupon.take() {
            tracing::debug!(coupon_code = %coupon.code, "Coupon removed");
        }
    }

    // =========================================================================
    // Accessors and derived values
    // =========================================================================

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|line| line.product.product_id == product_id)
    }

    #[must_use]
    pub const fn applied_coupon(&self) -> Option<&Coupon> {
        self.applied_coupon.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }

    #[must_use]
    pub fn subtotal(&self) -> Cents {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// The applied coupon's share of the subtotal, rounded half up.
    #[must_use]
    pub fn discount(&self) -> Cents {
        self.applied_coupon.as_ref().map_or(Cents::ZERO, |coupon| {
            self.subtotal().percent(coupon.discount_percent.get())
        })
    }

    #[must_use]
    pub fn total(&self) -> Cents {
        self.subtotal().saturating_sub(self.discount())
    }

    #[must_use]
    pub fn totals(&self) -> CartTotals {
        let subtotal = self.subtotal();
        let discount = self.discount();
        CartTotals {
            item_count: self.item_count(),
            subtotal,
            discount,
            total: subtotal.saturating_sub(discount),
        }
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product.product_id == product_id)
    }

    fn persist(&self) {
        if let Err(e) = save_json(self.store.as_ref(), keys::CART, &self.lines) {
            tracing::warn!(error = %e, "Failed to persist cart");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryBackend;
    use crate::models::DiscountPercent;
    use crate::storage::MemoryStore;
    use phonestore_core::{CouponId, CustomerId};

    fn product(price: i64) -> ProductSnapshot {
        ProductSnapshot {
            product_id: ProductId::generate(),
            name: "Galaxy S24".to_string(),
            unit_price: Cents::new(price),
            images: vec![],
            category: "smartphones".to_string(),
            is_promotion: false,
            variant_id: None,
            variant_name: None,
        }
    }

    fn engine() -> (Arc<MemoryBackend>, Arc<MemoryStore>, CartEngine) {
        let backend = Arc::new(MemoryBackend::new());
        let store = Arc::new(MemoryStore::new());
        let engine = CartEngine::new(store.clone(), backend.clone());
        (backend, store, engine)
    }

    fn customer() -> RetailProfile {
        RetailProfile {
            id: CustomerId::generate(),
            name: "Fabi".to_string(),
            phone: None,
            email: None,
        }
    }

    #[test]
    fn test_add_caps_at_max_quantity() {
        let (_, _, mut cart) = engine();
        let item = product(1_000);
        for _ in 0..7 {
            cart.add_to_cart(item.clone());
        }
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.lines()[0].quantity, 5);
        assert_eq!(cart.item_count(), 5);
    }

    #[test]
    fn test_update_quantity_rejects_zero_and_unknown() {
        let (_, _, mut cart) = engine();
        let item = product(1_000);
        let id = item.product_id;
        cart.add_to_cart(item);

        assert_eq!(cart.update_quantity(id, 0), Err(CartError::QuantityOutOfRange(0)));
        assert_eq!(cart.update_quantity(id, 6), Err(CartError::QuantityOutOfRange(6)));
        assert_eq!(cart.line(id).unwrap().quantity, 1);

        let other = ProductId::generate();
        assert_eq!(cart.update_quantity(other, 2), Err(CartError::LineNotFound(other)));

        cart.update_quantity(id, 4).unwrap();
        assert_eq!(cart.line(id).unwrap().quantity, 4);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let (_, store, mut cart) = engine();
        assert!(!cart.remove_from_cart(ProductId::generate()));
        assert!(!store.contains(keys::CART));
    }

    #[test]
    fn test_mutations_persist_and_rehydrate() {
        let (backend, store, mut cart) = engine();
        let item = product(2_500);
        let id = item.product_id;
        cart.add_to_cart(item);
        cart.update_quantity(id, 3).unwrap();

        let restored = CartEngine::new(store, backend);
        assert_eq!(restored.line(id).unwrap().quantity, 3);
        assert_eq!(restored.subtotal(), Cents::new(7_500));
        assert!(restored.applied_coupon().is_none());
    }

    #[test]
    fn test_rehydrate_drops_out_of_range_and_garbage() {
        let backend = Arc::new(MemoryBackend::new());
        let store = Arc::new(MemoryStore::new());

        let good = CartLine {
            product: product(100),
            quantity: 2,
        };
        let bad = CartLine {
            product: product(100),
            quantity: 9,
        };
        save_json(store.as_ref(), keys::CART, &[good.clone(), bad]).unwrap();
        let cart = CartEngine::new(store.clone(), backend.clone());
        assert_eq!(cart.lines(), &[good]);

        store.set(keys::CART, "not json").unwrap();
        let cart = CartEngine::new(store, backend);
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_rejection_keeps_previous_coupon() {
        let (backend, _, mut cart) = engine();
        let first = Coupon {
            id: CouponId::generate(),
            code: "FIRST5".to_string(),
            discount_percent: DiscountPercent::new(5).unwrap(),
            active: true,
            valid_until: None,
            min_purchase_value: None,
            allowed_categories: None,
        };
        backend.add_coupon(first.clone());
        cart.add_to_cart(product(10_000));
        let shopper = customer();

        cart.apply_coupon("FIRST5", Some(&shopper)).await.unwrap();
        let rejected = cart.apply_coupon("NOPE", Some(&shopper)).await;

        assert_eq!(rejected, Err(CouponRejection::InvalidCode));
        assert_eq!(cart.applied_coupon(), Some(&first));
        assert_eq!(cart.discount(), Cents::new(500));
    }

    #[tokio::test]
    async fn test_discount_rounds_half_up() {
        let (backend, _, mut cart) = engine();
        backend.add_coupon(Coupon {
            id: CouponId::generate(),
            code: "QUINZE".to_string(),
            discount_percent: DiscountPercent::new(15).unwrap(),
            active: true,
            valid_until: None,
            min_purchase_value: None,
            allowed_categories: None,
        });
        // 15% of 1_010 = 151.5
        cart.add_to_cart(product(1_010));
        cart.apply_coupon("QUINZE", Some(&customer())).await.unwrap();

        let totals = cart.totals();
        assert_eq!(totals.discount, Cents::new(152));
        assert_eq!(totals.total, Cents::new(858));
        assert_eq!(totals.total + totals.discount, totals.subtotal);

        cart.remove_coupon();
        assert_eq!(cart.discount(), Cents::ZERO);
        assert_eq!(cart.item_count(), 1);
    }
}
