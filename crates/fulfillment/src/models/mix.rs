//! Standard product mix configuration models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use restock_core::{MixComponentId, ProductId};

/// One product's share of the standard mix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixComponent {
    /// Unique component ID.
    pub id: MixComponentId,
    /// Product this share applies to.
    pub product_id: ProductId,
    /// Product display name, used when rendering shortfalls and records.
    pub product_name: String,
    /// Share of the order total, in percent.
    pub percentage: Decimal,
    /// Inactive components are excluded from allocation and the sum check.
    pub active: bool,
    /// When the component was created.
    pub created_at: DateTime<Utc>,
    /// When the component was last updated.
    pub updated_at: DateTime<Utc>,
}
