//! CLI command implementations.

pub mod migrate;
pub mod mix;
pub mod stock;

use restock_fulfillment::FulfillmentConfig;
use restock_fulfillment::db;
use sqlx::PgPool;

/// Load configuration and open a connection pool.
pub async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = FulfillmentConfig::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    Ok(pool)
}
