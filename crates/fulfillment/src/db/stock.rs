//! Database operations for the stock ledger.
//!
//! Balances are never stored; they are derived from the signed movement
//! ledger on every read.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use restock_core::{MovementKind, OperationKind, OrderId, ProductId, StockMovementId};

use super::RepositoryError;
use crate::models::movement::{ProductBalance, StockMovement};

/// Internal row type for movement queries.
#[derive(Debug, sqlx::FromRow)]
struct StockMovementRow {
    id: i32,
    product_id: i32,
    kind: MovementKind,
    quantity: i32,
    reference_kind: Option<OperationKind>,
    reference_id: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<StockMovementRow> for StockMovement {
    fn from(row: StockMovementRow) -> Self {
        Self {
            id: StockMovementId::new(row.id),
            product_id: ProductId::new(row.product_id),
            kind: row.kind,
            quantity: row.quantity,
            reference_kind: row.reference_kind,
            reference_id: row.reference_id.map(OrderId::new),
            created_at: row.created_at,
        }
    }
}

/// Internal row type for balance queries.
#[derive(Debug, sqlx::FromRow)]
struct BalanceRow {
    product_id: i32,
    balance: i64,
}

/// Repository for stock ledger database operations.
pub struct StockRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StockRepository<'a> {
    /// Create a new stock repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Current ledger-derived balance for one product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn balance(&self, product_id: ProductId) -> Result<i64, RepositoryError> {
        let balance: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(CASE WHEN kind = 'credit' THEN quantity ELSE -quantity END), 0)::bigint \
             FROM fulfillment.stock_movement \
             WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(balance)
    }

    /// Current balance for every product with ledger activity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn balances(&self) -> Result<Vec<ProductBalance>, RepositoryError> {
        let rows = sqlx::query_as::<_, BalanceRow>(
            "SELECT product_id, \
                    COALESCE(SUM(CASE WHEN kind = 'credit' THEN quantity ELSE -quantity END), 0)::bigint AS balance \
             FROM fulfillment.stock_movement \
             GROUP BY product_id \
             ORDER BY product_id ASC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProductBalance {
                product_id: ProductId::new(row.product_id),
                balance: row.balance,
            })
            .collect())
    }

    /// Whether a confirmation of this kind already wrote movements for the order.
    ///
    /// This is the fast-path duplicate guard; the unique index on the
    /// movement reference is the authoritative one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn movement_exists(
        &self,
        kind: OperationKind,
        order_id: OrderId,
    ) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS ( \
                 SELECT 1 FROM fulfillment.stock_movement \
                 WHERE reference_kind = $1 AND reference_id = $2 \
             )",
        )
        .bind(kind)
        .bind(order_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Movements written against one order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn movements_for_order(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<StockMovement>, RepositoryError> {
        let rows = sqlx::query_as::<_, StockMovementRow>(
            "SELECT id, product_id, kind, quantity, reference_kind, reference_id, created_at \
             FROM fulfillment.stock_movement \
             WHERE reference_id = $1 \
             ORDER BY created_at ASC, id ASC",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Write a manual credit movement (production intake, adjustment).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert_credit(
        &self,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<StockMovement, RepositoryError> {
        let row = sqlx::query_as::<_, StockMovementRow>(
            "INSERT INTO fulfillment.stock_movement (product_id, kind, quantity) \
             VALUES ($1, 'credit', $2) \
             RETURNING id, product_id, kind, quantity, reference_kind, reference_id, created_at",
        )
        .bind(product_id)
        .bind(quantity)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Write one reservation debit inside the caller's transaction.
    ///
    /// The `(reference_kind, reference_id, product_id)` unique index turns a
    /// concurrent duplicate confirmation into `RepositoryError::Conflict`,
    /// aborting the whole transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if this reference already debited
    /// the product. Returns `RepositoryError::Database` for other errors.
    pub async fn insert_debit(
        conn: &mut PgConnection,
        kind: OperationKind,
        order_id: OrderId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<StockMovement, RepositoryError> {
        let row = sqlx::query_as::<_, StockMovementRow>(
            "INSERT INTO fulfillment.stock_movement \
                 (product_id, kind, quantity, reference_kind, reference_id) \
             VALUES ($1, 'debit', $2, $3, $4) \
             RETURNING id, product_id, kind, quantity, reference_kind, reference_id, created_at",
        )
        .bind(product_id)
        .bind(quantity)
        .bind(kind)
        .bind(order_id)
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("idx_stock_movement_reference")
            {
                return RepositoryError::Conflict(format!(
                    "{kind} already recorded for order {order_id}"
                ));
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }
}
