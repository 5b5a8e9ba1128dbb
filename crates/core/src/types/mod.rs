//! Core types for phonestore.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cnpj;
pub mod email;
pub mod id;
pub mod money;
pub mod role;

pub use cnpj::{Cnpj, CnpjError};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::Cents;
pub use role::{Permissions, Role};
