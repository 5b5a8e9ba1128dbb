//! Phonestore Core - Shared domain types.
//!
//! This crate provides the types shared by every phonestore component:
//! - `storefront` - Session resolution and cart/coupon engine
//! - `cli` - Command-line driver for a storefront session
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no network access,
//! no local storage. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, money, emails, CNPJs and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
