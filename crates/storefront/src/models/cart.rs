//! Cart lines and derived totals.

use serde::{Deserialize, Serialize};

use phonestore_core::{Cents, ProductId, VariantId};

/// Product data captured at the moment it is added to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Cents,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    #[serde(default)]
    pub is_promotion: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<VariantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
}

/// One entry in the cart, keyed by product ID.
///
/// Serialized flat: the product fields plus `quantity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    #[serde(flatten)]
    pub product: ProductSnapshot,
    pub quantity: u32,
}

impl CartLine {
    /// Smallest quantity a line can hold.
    pub const MIN_QUANTITY: u32 = 1;
    /// Largest quantity a line can hold.
    pub const MAX_QUANTITY: u32 = 5;

    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Cents {
        self.product.unit_price * self.quantity
    }

    /// Whether `quantity` is within the allowed range.
    #[must_use]
    pub const fn quantity_in_range(quantity: u32) -> bool {
        quantity >= Self::MIN_QUANTITY && quantity <= Self::MAX_QUANTITY
    }
}

/// Snapshot of the cart's derived values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub item_count: u32,
    pub subtotal: Cents,
    pub discount: Cents,
    pub total: Cents,
}
