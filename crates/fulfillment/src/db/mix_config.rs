//! Database operations for the standard product mix configuration.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use restock_core::{MixComponentId, ProductId};

use super::RepositoryError;
use crate::models::mix::MixComponent;

/// Internal row type for mix component queries.
#[derive(Debug, sqlx::FromRow)]
struct MixComponentRow {
    id: i32,
    product_id: i32,
    product_name: String,
    percentage: Decimal,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MixComponentRow> for MixComponent {
    fn from(row: MixComponentRow) -> Self {
        Self {
            id: MixComponentId::new(row.id),
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            percentage: row.percentage,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for mix configuration database operations.
pub struct MixConfigRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MixConfigRepository<'a> {
    /// Create a new mix configuration repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the active components, in insertion order.
    ///
    /// Only these participate in allocation and in the 100% sum check.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn active_components(&self) -> Result<Vec<MixComponent>, RepositoryError> {
        let rows = sqlx::query_as::<_, MixComponentRow>(
            "SELECT id, product_id, product_name, percentage, active, created_at, updated_at \
             FROM fulfillment.product_mix_config \
             WHERE active \
             ORDER BY id ASC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// List every component, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all_components(&self) -> Result<Vec<MixComponent>, RepositoryError> {
        let rows = sqlx::query_as::<_, MixComponentRow>(
            "SELECT id, product_id, product_name, percentage, active, created_at, updated_at \
             FROM fulfillment.product_mix_config \
             ORDER BY id ASC",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Activate or deactivate a component.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the component doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn set_active(
        &self,
        id: MixComponentId,
        active: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE fulfillment.product_mix_config SET active = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(active)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
