//! Phone store storefront core.
//!
//! Session and role resolution, the cart and its pricing rules, and the
//! backend and storage they run against. Front ends (the CLI, a web app)
//! construct the services with the collaborators they need.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod storage;
