//! Proportional allocation of an order total across the product mix.
//!
//! Pure functions; all rounding is floor-based with the remainder assigned
//! to the largest share so totals stay exact.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use restock_core::ProductId;

use crate::models::mix::MixComponent;

const FULL_PERCENT: Decimal = Decimal::from_parts(100, 0, 0, false, 0);
/// Allowed deviation of the active percentage sum from 100.
const SUM_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Whether a mix's percentages sum to 100 within tolerance.
///
/// An empty mix is never usable.
#[must_use]
pub fn mix_is_usable(mix: &[MixComponent]) -> bool {
    if mix.is_empty() {
        return false;
    }
    let sum: Decimal = mix.iter().map(|component| component.percentage).sum();
    (sum - FULL_PERCENT).abs() <= SUM_TOLERANCE
}

/// Split `total_quantity` across the mix proportionally.
///
/// Per product the share is `floor(percentage / 100 * total)`; the rounding
/// remainder goes entirely to the product with the strictly largest
/// percentage (first encountered wins ties, so the result is deterministic
/// in input order). Zero-quantity entries are dropped.
///
/// Returns an empty map when the mix is unusable - the caller must fall
/// back, never approximate.
#[must_use]
pub fn allocate(total_quantity: i32, mix: &[MixComponent]) -> BTreeMap<ProductId, i32> {
    if total_quantity < 0 || !mix_is_usable(mix) {
        return BTreeMap::new();
    }

    let total = Decimal::from(total_quantity);
    let mut shares: Vec<(ProductId, i32)> = Vec::with_capacity(mix.len());
    let mut largest: Option<(usize, Decimal)> = None;

    for (index, component) in mix.iter().enumerate() {
        let quantity = (component.percentage * total / FULL_PERCENT)
            .floor()
            .to_i32()
            .unwrap_or(0)
            .max(0);
        if largest.is_none_or(|(_, percentage)| component.percentage > percentage) {
            largest = Some((index, component.percentage));
        }
        shares.push((component.product_id, quantity));
    }

    let assigned: i32 = shares.iter().map(|(_, quantity)| quantity).sum();
    let remainder = total_quantity - assigned;
    if remainder > 0
        && let Some((index, _)) = largest
        && let Some((_, quantity)) = shares.get_mut(index)
    {
        *quantity += remainder;
    }

    shares
        .into_iter()
        .filter(|(_, quantity)| *quantity > 0)
        .collect()
}

/// Split `total_quantity` as evenly as possible across `products`.
///
/// Fallback policy for an unusable mix or a Custom order with no item list:
/// every product gets `floor(total / n)`, and the first `total % n` products
/// in input order get one extra unit.
#[must_use]
pub fn allocate_even(total_quantity: i32, products: &[ProductId]) -> BTreeMap<ProductId, i32> {
    if total_quantity <= 0 || products.is_empty() {
        return BTreeMap::new();
    }

    let count = i32::try_from(products.len()).unwrap_or(i32::MAX);
    let base = total_quantity / count;
    let remainder = usize::try_from(total_quantity % count).unwrap_or(0);

    products
        .iter()
        .enumerate()
        .map(|(index, &product_id)| (product_id, base + i32::from(index < remainder)))
        .filter(|(_, quantity)| *quantity > 0)
        .collect()
}
