//! Copperpot Core - Shared types library.
//!
//! This crate provides common types used across all Copperpot Market
//! components:
//! - `server` - Cart, checkout and order-management service
//! - `integration-tests` - End-to-end tests against the service
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, order statuses, variant
//!   selectors and shipping addresses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
