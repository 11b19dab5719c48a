//! Core types for Copperpot Market.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod id;
pub mod status;
pub mod variant;

pub use address::{AddressError, ShippingAddress};
pub use id::*;
pub use status::OrderStatus;
pub use variant::VariantSelector;
