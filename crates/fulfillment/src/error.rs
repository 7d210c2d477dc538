//! Unified error handling for the fulfillment pipeline.

use thiserror::Error;

use restock_core::{OperationKind, OrderId, OrderStatus, OrderSubStatus};

use crate::db::RepositoryError;
use crate::models::ShortfallReport;

/// Service-level error type for fulfillment operations.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    /// One or more products have insufficient stock for the batch.
    ///
    /// Raised before any stock mutation; carries the full itemized list.
    #[error("insufficient stock: {0}")]
    Shortfall(ShortfallReport),

    /// The operation was already processed for this order.
    #[error("{kind} already processed for order {order_id}")]
    DuplicateOperation {
        /// Order the duplicate was detected for.
        order_id: OrderId,
        /// Operation kind that was already recorded.
        kind: OperationKind,
    },

    /// The mix configuration is unusable for Standard allocation.
    #[error("mix configuration unusable: {0}")]
    Configuration(String),

    /// A backend write failed after validation passed.
    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),

    /// The order is not in the pre-state the transition requires.
    #[error("order {order_id} cannot {action} from {status}/{sub_status}")]
    InvalidTransition {
        /// Order the transition was attempted on.
        order_id: OrderId,
        /// Status at attempt time.
        status: OrderStatus,
        /// Sub-status at attempt time.
        sub_status: OrderSubStatus,
        /// The attempted action, for diagnostics.
        action: &'static str,
    },

    /// The order payload violates an invariant.
    #[error("invalid order: {0}")]
    InvalidOrder(String),
}

impl FulfillmentError {
    /// Whether the error occurred before any stock mutation.
    ///
    /// Pure validation failures leave all state untouched and can be
    /// surfaced directly for presentation.
    #[must_use]
    pub const fn is_validation_failure(&self) -> bool {
        matches!(
            self,
            Self::Shortfall(_) | Self::DuplicateOperation { .. } | Self::InvalidTransition { .. } | Self::InvalidOrder(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ShortfallLine;
    use restock_core::ProductId;

    #[test]
    fn test_shortfall_display_is_itemized() {
        let err = FulfillmentError::Shortfall(ShortfallReport {
            lines: vec![ShortfallLine {
                product_id: ProductId::new(3),
                product_name: "Multigrain".to_string(),
                needed: 12,
                available: 5,
                missing: 7,
            }],
        });
        assert!(err.to_string().contains("Multigrain: need 12, have 5 (missing 7)"));
        assert!(err.is_validation_failure());
    }

    #[test]
    fn test_duplicate_display() {
        let err = FulfillmentError::DuplicateOperation {
            order_id: OrderId::new(9),
            kind: OperationKind::Delivery,
        };
        assert_eq!(err.to_string(), "delivery already processed for order 9");
        assert!(err.is_validation_failure());
    }

    #[test]
    fn test_persistence_is_not_validation_failure() {
        let err = FulfillmentError::Persistence(RepositoryError::NotFound);
        assert!(!err.is_validation_failure());
    }
}
