//! Storage layer for the order-processing path.
//!
//! All durable state (products, carts, orders) lives behind the
//! [`ShopStore`] trait. Two implementations exist:
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx, the production backend. The stock
//!   reservation is a single conditional `UPDATE`, so the check-then-decrement
//!   cannot race across service instances.
//! - [`MemoryStore`] - in-process `HashMap`s behind an `RwLock`, for tests
//!   and local development.
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and are embedded via
//! `sqlx::migrate!`; the binary applies them at startup.

pub mod memory;
pub mod postgres;
pub mod store;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{ReserveOutcome, ShopStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., concurrent status change).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
