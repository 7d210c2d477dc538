//! Collaborator interfaces consumed by the fulfillment pipeline.
//!
//! Both gateways are trait seams so the validator and state machine can be
//! exercised against in-memory implementations; production wiring uses the
//! `PostgreSQL`-backed types below.

use sqlx::PgPool;

use restock_core::{ClientId, ProductId};

use crate::db::{RepositoryError, StockRepository};

/// Source of current per-product stock balances.
///
/// Balances are ledger-derived and may be stale by the time a debit is
/// attempted; the movement-reference unique index is the final arbiter.
pub trait BalanceGateway: Send + Sync {
    /// Current balance for one product.
    fn balance(
        &self,
        product_id: ProductId,
    ) -> impl Future<Output = Result<i64, RepositoryError>> + Send;
}

/// Source of client delivery periodicity.
pub trait ClientDirectory: Send + Sync {
    /// The client's delivery cycle length in days.
    fn periodicity_days(
        &self,
        client_id: ClientId,
    ) -> impl Future<Output = Result<i64, RepositoryError>> + Send;
}

/// Balance gateway backed by the stock movement ledger.
#[derive(Clone)]
pub struct LedgerBalanceGateway {
    pool: PgPool,
}

impl LedgerBalanceGateway {
    /// Create a ledger-backed balance gateway.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl BalanceGateway for LedgerBalanceGateway {
    async fn balance(&self, product_id: ProductId) -> Result<i64, RepositoryError> {
        StockRepository::new(&self.pool).balance(product_id).await
    }
}

/// Client directory backed by the periodicity read model.
#[derive(Clone)]
pub struct PgClientDirectory {
    pool: PgPool,
}

impl PgClientDirectory {
    /// Create a database-backed client directory.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ClientDirectory for PgClientDirectory {
    async fn periodicity_days(&self, client_id: ClientId) -> Result<i64, RepositoryError> {
        let days: Option<i32> = sqlx::query_scalar(
            "SELECT periodicity_days FROM fulfillment.client_periodicity WHERE client_id = $1",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        days.map(i64::from).ok_or(RepositoryError::NotFound)
    }
}
