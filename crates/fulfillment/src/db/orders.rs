//! Database operations for recurring orders.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use restock_core::{ClientId, MixType, OrderId, OrderStatus, OrderSubStatus};

use super::RepositoryError;
use crate::models::order::{CustomItem, NewOrder, Order};

const ORDER_COLUMNS: &str = "id, client_id, scheduled_date, total_quantity, mix_type, \
     status, sub_status, custom_items, created_at, updated_at";

/// Internal row type for order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    client_id: i32,
    scheduled_date: NaiveDate,
    total_quantity: i32,
    mix_type: MixType,
    status: OrderStatus,
    sub_status: OrderSubStatus,
    custom_items: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_order(self) -> Result<Order, RepositoryError> {
        let custom_items: Vec<CustomItem> =
            serde_json::from_value(self.custom_items).map_err(|e| {
                RepositoryError::DataCorruption(format!(
                    "order {} has malformed custom_items: {e}",
                    self.id
                ))
            })?;

        Ok(Order {
            id: OrderId::new(self.id),
            client_id: ClientId::new(self.client_id),
            scheduled_date: self.scheduled_date,
            total_quantity: self.total_quantity,
            mix_type: self.mix_type,
            status: self.status,
            sub_status: self.sub_status,
            custom_items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a new order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert(&self, input: &NewOrder) -> Result<Order, RepositoryError> {
        let items = serde_json::to_value(&input.custom_items)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "INSERT INTO fulfillment.orders \
                 (client_id, scheduled_date, total_quantity, mix_type, custom_items) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(input.client_id)
        .bind(input.scheduled_date)
        .bind(input.total_quantity)
        .bind(input.mix_type)
        .bind(items)
        .fetch_one(self.pool)
        .await?;

        row.into_order()
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM fulfillment.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(OrderRow::into_order).transpose()
    }

    /// List orders in a given status, oldest scheduled date first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM fulfillment.orders \
             WHERE status = $1 \
             ORDER BY scheduled_date ASC, id ASC"
        ))
        .bind(status)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }

    /// List orders due on a given date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_due_on(&self, date: NaiveDate) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM fulfillment.orders \
             WHERE scheduled_date = $1 \
             ORDER BY client_id ASC, id ASC"
        ))
        .bind(date)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(OrderRow::into_order).collect()
    }

    /// Persist the outcome of a fulfillment transition.
    ///
    /// Writes the full transition contract: schedule date, status,
    /// sub-status, and the (preserved) mix fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_transition(&self, order: &Order) -> Result<(), RepositoryError> {
        let items = serde_json::to_value(&order.custom_items)
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;

        let result = sqlx::query(
            "UPDATE fulfillment.orders \
             SET scheduled_date = $2, status = $3, sub_status = $4, \
                 mix_type = $5, custom_items = $6 \
             WHERE id = $1",
        )
        .bind(order.id)
        .bind(order.scheduled_date)
        .bind(order.status)
        .bind(order.sub_status)
        .bind(order.mix_type)
        .bind(items)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
