//! Storefront services.
//!
//! # Services
//!
//! - `session` - Auth session tracking and role resolution
//! - `cart` - Cart contents, pricing and coupons

pub mod cart;
pub mod session;

pub use cart::{CartEngine, CartError, CouponRejection};
pub use session::{SessionContext, SessionResolver, resolve_role};
