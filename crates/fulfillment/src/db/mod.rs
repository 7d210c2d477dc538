//! Database operations for the fulfillment `PostgreSQL` schema.
//!
//! # Schema: `fulfillment`
//!
//! ## Tables
//!
//! - `orders` - Recurring client orders (continuously rescheduled)
//! - `product_mix_config` - Standard percentage mix per product
//! - `stock_movement` - Signed stock ledger (balances are derived)
//! - `delivery_record` - Append-only delivery/return history
//! - `client_periodicity` - Read model of client delivery periodicity
//!
//! # Migrations
//!
//! Migrations are stored in `crates/fulfillment/migrations/` and run via:
//! ```bash
//! cargo run -p restock-cli -- migrate
//! ```

pub mod mix_config;
pub mod orders;
pub mod records;
pub mod stock;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use mix_config::MixConfigRepository;
pub use orders::OrderRepository;
pub use records::DeliveryRecordRepository;
pub use stock::StockRepository;

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

    /// Constraint violation (e.g., duplicate movement reference).
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
