//! Ephemeral demand structures produced per validation call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use restock_core::{OrderId, ProductId};

/// Demand for one product within one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandLine {
    /// Product needed.
    pub product_id: ProductId,
    /// Product display name.
    pub product_name: String,
    /// Units needed for this order.
    pub quantity: i32,
}

/// Resolved demand for a single order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDemand {
    /// Order the demand belongs to.
    pub order_id: OrderId,
    /// Per-product demand lines; zero-quantity entries are already dropped.
    pub lines: Vec<DemandLine>,
}

/// Demand for one product aggregated across a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateDemand {
    /// Product display name.
    pub product_name: String,
    /// Units needed across all orders in the batch.
    pub quantity: i64,
}

/// The full demand resolution for an order batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandPlan {
    /// Demand broken down per order; movements are tagged per order id.
    pub per_order: Vec<OrderDemand>,
    /// Demand summed per product; the balance check runs against these.
    pub totals: BTreeMap<ProductId, AggregateDemand>,
    /// Human-readable notes for every order that fell back to the even
    /// distribution because the configured mix was missing or unusable.
    pub degradations: Vec<String>,
}

impl DemandPlan {
    /// Total units across the whole batch.
    #[must_use]
    pub fn total_units(&self) -> i64 {
        self.totals.values().map(|demand| demand.quantity).sum()
    }
}

/// One product's gap between needed and available stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortfallLine {
    /// Product that is short.
    pub product_id: ProductId,
    /// Product display name.
    pub product_name: String,
    /// Units the batch needs.
    pub needed: i64,
    /// Units currently available.
    pub available: i64,
    /// `needed - available`.
    pub missing: i64,
}

/// Itemized rejection report for a stock-affecting operation.
///
/// Always carries every insufficient product, never just the first, so a
/// caller can render all problems at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortfallReport {
    /// All insufficient products for the batch.
    pub lines: Vec<ShortfallLine>,
}

impl std::fmt::Display for ShortfallReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, line) in self.lines.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(
                f,
                "{}: need {}, have {} (missing {})",
                line.product_name, line.needed, line.available, line.missing
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shortfall_report_lists_every_line() {
        let report = ShortfallReport {
            lines: vec![
                ShortfallLine {
                    product_id: ProductId::new(1),
                    product_name: "Wheat Loaf".to_string(),
                    needed: 60,
                    available: 40,
                    missing: 20,
                },
                ShortfallLine {
                    product_id: ProductId::new(2),
                    product_name: "Rye Loaf".to_string(),
                    needed: 25,
                    available: 10,
                    missing: 15,
                },
            ],
        };
        let rendered = report.to_string();
        assert!(rendered.contains("Wheat Loaf: need 60, have 40 (missing 20)"));
        assert!(rendered.contains("Rye Loaf: need 25, have 10 (missing 15)"));
    }
}
