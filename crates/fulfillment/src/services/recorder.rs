//! Delivery/return history recorder.

use sqlx::PgConnection;

use restock_core::{ClientId, OperationKind, OrderId, OrderSubStatus};

use crate::db::{DeliveryRecordRepository, RepositoryError};
use crate::models::record::{DeliveryRecord, RecordItem};

/// Appends immutable history entries for confirmed operations.
///
/// Purely additive: it never reads or reasons about current order state. It
/// participates in the caller's transaction so a history entry can only
/// exist together with the stock debits it describes.
pub struct DeliveryRecorder;

impl DeliveryRecorder {
    /// Append one history entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(
        conn: &mut PgConnection,
        client_id: ClientId,
        order_id: OrderId,
        kind: OperationKind,
        total_quantity: i32,
        items: &[RecordItem],
        prior_sub_status: OrderSubStatus,
    ) -> Result<DeliveryRecord, RepositoryError> {
        DeliveryRecordRepository::insert(
            conn,
            client_id,
            order_id,
            kind,
            total_quantity,
            items,
            prior_sub_status,
        )
        .await
    }
}
