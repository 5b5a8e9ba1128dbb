//! Domain models for the storefront.
//!
//! - [`session`] - Auth identity, session and change events
//! - [`profile`] - Resolved business profiles (admin, wholesale, retail)
//! - [`cart`] - Cart lines and derived totals
//! - [`coupon`] - Coupons as stored by the backend

pub mod cart;
pub mod coupon;
pub mod profile;
pub mod session;

pub use cart::{CartLine, CartTotals, ProductSnapshot};
pub use coupon::{Coupon, DiscountPercent};
pub use profile::{AdminProfile, PrivilegedProfile, ResolvedProfile, RetailProfile, WholesaleProfile};
pub use session::{AuthEvent, Identity, Session};
