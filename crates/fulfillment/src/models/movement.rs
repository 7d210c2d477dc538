//! Stock ledger models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use restock_core::{MovementKind, OperationKind, OrderId, ProductId, StockMovementId};

/// One signed entry in the stock ledger.
///
/// Movements written by a delivery/return confirmation carry the confirming
/// order as a reference; manual ledger adjustments carry none.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    /// Unique movement ID.
    pub id: StockMovementId,
    /// Product moved.
    pub product_id: ProductId,
    /// Credit or debit.
    pub kind: MovementKind,
    /// Units moved; always positive, the kind carries the sign.
    pub quantity: i32,
    /// Operation kind of the confirmation that wrote this movement, if any.
    pub reference_kind: Option<OperationKind>,
    /// Order the confirmation was for, if any.
    pub reference_id: Option<OrderId>,
    /// When the movement was written.
    pub created_at: DateTime<Utc>,
}

/// Ledger-derived balance for one product.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProductBalance {
    /// Product the balance applies to.
    pub product_id: ProductId,
    /// Current balance: credits minus debits.
    pub balance: i64,
}
