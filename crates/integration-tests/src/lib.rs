//! Integration tests for Restock.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p restock-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `pipeline` - Full order lifecycle against in-memory collaborators
//! - `allocation` - Allocator behavior across crate boundaries
//! - `statuses` - Status enum contracts consumed by presentation layers
//!
//! These tests run against the in-memory collaborators from
//! `restock_fulfillment::testing`; no live database is required.

use chrono::{NaiveDate, Utc};

use restock_core::{ClientId, MixComponentId, MixType, OrderId, OrderStatus, OrderSubStatus, ProductId};
use restock_fulfillment::models::mix::MixComponent;
use restock_fulfillment::models::order::Order;

/// The three-product mix used across the test suite.
#[must_use]
pub fn standard_mix() -> Vec<MixComponent> {
    vec![
        mix_component(1, "Wheat Loaf", "60"),
        mix_component(2, "Rye Loaf", "25"),
        mix_component(3, "Multigrain", "15"),
    ]
}

/// Build one mix component with the product id doubling as component id.
#[must_use]
pub fn mix_component(id: i32, name: &str, percentage: &str) -> MixComponent {
    MixComponent {
        id: MixComponentId::new(id),
        product_id: ProductId::new(id),
        product_name: name.to_string(),
        percentage: percentage.parse().expect("valid decimal literal"),
        active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Build an unscheduled standard order.
#[must_use]
pub fn new_order(id: i32, client: i32, total: i32) -> Order {
    Order {
        id: OrderId::new(id),
        client_id: ClientId::new(client),
        scheduled_date: NaiveDate::from_ymd_opt(2024, 3, 4).expect("valid date"),
        total_quantity: total,
        mix_type: MixType::Standard,
        status: OrderStatus::ToSchedule,
        sub_status: OrderSubStatus::Pending,
        custom_items: vec![],
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
