//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! restock-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `RESTOCK_DATABASE_URL` - `PostgreSQL` connection string
//!
//! Migration files live in `crates/fulfillment/migrations/` and are embedded
//! at compile time.

use thiserror::Error;

/// Errors raised while running migrations.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Configuration error: {0}")]
    Config(#[from] restock_fulfillment::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run the fulfillment database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if configuration is missing, the database is
/// unreachable, or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let config = restock_fulfillment::FulfillmentConfig::from_env()?;

    tracing::info!("Connecting to fulfillment database...");
    let pool = restock_fulfillment::db::create_pool(&config.database_url).await?;

    tracing::info!("Running fulfillment migrations...");
    sqlx::migrate!("../fulfillment/migrations").run(&pool).await?;

    tracing::info!("Fulfillment migrations complete!");
    Ok(())
}
