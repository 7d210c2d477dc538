//! Recurring order domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use restock_core::{ClientId, MixType, OrderId, OrderStatus, OrderSubStatus, ProductId};

/// One line of a client-customized product mix.
///
/// `product_id` may be absent on items captured by name only; the validator
/// resolves those against the mix configuration at demand time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomItem {
    /// Product reference, when known at capture time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<ProductId>,
    /// Product display name, unique within one order's item list.
    pub product_name: String,
    /// Units of this product in the order.
    pub quantity: i32,
}

/// A recurring delivery order for one client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Client this order belongs to.
    pub client_id: ClientId,
    /// Date of the next reposition.
    pub scheduled_date: NaiveDate,
    /// Total units across all products.
    pub total_quantity: i32,
    /// Whether the mix comes from the standard configuration or the item list.
    pub mix_type: MixType,
    /// Scheduling status.
    pub status: OrderStatus,
    /// Pipeline position; meaningful only while `status` is `Scheduled`.
    pub sub_status: OrderSubStatus,
    /// Client-specified item list; populated iff `mix_type` is `Custom`.
    pub custom_items: Vec<CustomItem>,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Sum of the custom item quantities.
    #[must_use]
    pub fn custom_items_total(&self) -> i32 {
        self.custom_items.iter().map(|item| item.quantity).sum()
    }

    /// Whether the custom item list is consistent with `total_quantity`.
    ///
    /// Standard orders are always consistent; a Custom order must have its
    /// item quantities sum to the order total before it can be confirmed
    /// into the pipeline.
    #[must_use]
    pub fn custom_total_matches(&self) -> bool {
        self.mix_type == MixType::Standard || self.custom_items_total() == self.total_quantity
    }

    /// Capture the transition-mutable fields for a later revert.
    #[must_use]
    pub fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot {
            scheduled_date: self.scheduled_date,
            status: self.status,
            sub_status: self.sub_status,
        }
    }

    /// Restore the transition-mutable fields from a snapshot.
    pub fn restore(&mut self, snapshot: OrderSnapshot) {
        self.scheduled_date = snapshot.scheduled_date;
        self.status = snapshot.status;
        self.sub_status = snapshot.sub_status;
    }
}

/// The fields a fulfillment transition may change.
///
/// Mix type and custom items are deliberately absent: no transition touches
/// them, they are preserved verbatim across every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSnapshot {
    /// Reposition date at capture time.
    pub scheduled_date: NaiveDate,
    /// Status at capture time.
    pub status: OrderStatus,
    /// Sub-status at capture time.
    pub sub_status: OrderSubStatus,
}

/// Input for creating a new order.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    /// Client the order belongs to.
    pub client_id: ClientId,
    /// Initial reposition date.
    pub scheduled_date: NaiveDate,
    /// Total units across all products.
    pub total_quantity: i32,
    /// Mix source for the order.
    pub mix_type: MixType,
    /// Item list for Custom orders; empty for Standard.
    #[serde(default)]
    pub custom_items: Vec<CustomItem>,
}
