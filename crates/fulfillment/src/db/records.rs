//! Database operations for the delivery/return history.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use restock_core::{ClientId, OperationKind, OrderId, OrderSubStatus};

use super::RepositoryError;
use crate::models::record::{DeliveryRecord, RecordItem};

/// Internal row type for history queries.
#[derive(Debug, sqlx::FromRow)]
struct DeliveryRecordRow {
    id: Uuid,
    client_id: i32,
    order_id: i32,
    occurred_at: DateTime<Utc>,
    operation_kind: OperationKind,
    total_quantity: i32,
    items: serde_json::Value,
    prior_sub_status: OrderSubStatus,
}

impl DeliveryRecordRow {
    fn into_record(self) -> Result<DeliveryRecord, RepositoryError> {
        let items: Vec<RecordItem> = serde_json::from_value(self.items).map_err(|e| {
            RepositoryError::DataCorruption(format!(
                "delivery record {} has malformed items: {e}",
                self.id
            ))
        })?;

        Ok(DeliveryRecord {
            id: self.id,
            client_id: ClientId::new(self.client_id),
            order_id: OrderId::new(self.order_id),
            occurred_at: self.occurred_at,
            operation_kind: self.operation_kind,
            total_quantity: self.total_quantity,
            items,
            prior_sub_status: self.prior_sub_status,
        })
    }
}

/// Repository for delivery record database operations.
pub struct DeliveryRecordRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DeliveryRecordRepository<'a> {
    /// Create a new delivery record repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Most recent history entries for a client.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_client(
        &self,
        client_id: ClientId,
        limit: i64,
    ) -> Result<Vec<DeliveryRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, DeliveryRecordRow>(
            "SELECT id, client_id, order_id, occurred_at, operation_kind, \
                    total_quantity, items, prior_sub_status \
             FROM fulfillment.delivery_record \
             WHERE client_id = $1 \
             ORDER BY occurred_at DESC \
             LIMIT $2",
        )
        .bind(client_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(DeliveryRecordRow::into_record).collect()
    }

    /// Append one history entry inside the caller's transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert(
        conn: &mut PgConnection,
        client_id: ClientId,
        order_id: OrderId,
        operation_kind: OperationKind,
        total_quantity: i32,
        items: &[RecordItem],
        prior_sub_status: OrderSubStatus,
    ) -> Result<DeliveryRecord, RepositoryError> {
        let items_value = serde_json::to_value(items)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let row = sqlx::query_as::<_, DeliveryRecordRow>(
            "INSERT INTO fulfillment.delivery_record \
                 (client_id, order_id, operation_kind, total_quantity, items, prior_sub_status) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, client_id, order_id, occurred_at, operation_kind, \
                       total_quantity, items, prior_sub_status",
        )
        .bind(client_id)
        .bind(order_id)
        .bind(operation_kind)
        .bind(total_quantity)
        .bind(items_value)
        .bind(prior_sub_status)
        .fetch_one(conn)
        .await?;

        row.into_record()
    }
}
