//! Delivery/return history models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use restock_core::{ClientId, OperationKind, OrderId, OrderSubStatus, ProductId};

/// A resolved product/quantity pair inside a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordItem {
    /// Product delivered or swapped.
    pub product_id: ProductId,
    /// Product display name at confirmation time.
    pub product_name: String,
    /// Units of this product.
    pub quantity: i32,
}

/// An immutable history entry for one confirmed delivery or return.
///
/// Written exactly once per successful confirmation, in the same transaction
/// as the stock debits it describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// Unique record ID.
    pub id: Uuid,
    /// Client the operation was for.
    pub client_id: ClientId,
    /// Order the operation confirmed.
    pub order_id: OrderId,
    /// When the operation was recorded.
    pub occurred_at: DateTime<Utc>,
    /// Delivery or return.
    pub operation_kind: OperationKind,
    /// Total units across all items.
    pub total_quantity: i32,
    /// Resolved product/quantity list.
    pub items: Vec<RecordItem>,
    /// Pipeline position the order held before confirmation.
    pub prior_sub_status: OrderSubStatus,
}
