//! Inventory reservation validation and execution.
//!
//! Demand for a batch is resolved per order (custom item list or standard
//! allocation), summed per product, and checked against the ledger balance
//! for every product at once. A batch is authorized all-or-nothing: one
//! insufficient product rejects every debit, and the rejection carries the
//! complete shortfall list.

use std::collections::BTreeMap;
use std::sync::Arc;

use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use restock_core::{ClientId, MixType, OperationKind, OrderId, OrderSubStatus, ProductId};

use crate::db::{RepositoryError, StockRepository};
use crate::error::FulfillmentError;
use crate::events::{EventBus, FulfillmentEvent};
use crate::models::demand::{AggregateDemand, DemandLine, DemandPlan, OrderDemand, ShortfallLine, ShortfallReport};
use crate::models::mix::MixComponent;
use crate::models::order::Order;
use crate::models::record::{DeliveryRecord, RecordItem};
use crate::services::allocation;
use crate::services::cache::{BatchKey, DemandCache};
use crate::services::gateway::BalanceGateway;
use crate::services::recorder::DeliveryRecorder;

// =============================================================================
// Demand resolution (pure)
// =============================================================================

/// Where an order's demand comes from.
///
/// Tagged so the resolution branches exhaustively instead of probing item
/// shapes at runtime.
enum DemandSource<'a> {
    Standard(&'a [MixComponent]),
    Custom(&'a [crate::models::order::CustomItem]),
}

impl<'a> DemandSource<'a> {
    fn for_order(order: &'a Order, mix: &'a [MixComponent]) -> Self {
        match order.mix_type {
            MixType::Standard => Self::Standard(mix),
            MixType::Custom => Self::Custom(&order.custom_items),
        }
    }
}

fn lookup_by_name(mix: &[MixComponent], name: &str) -> Option<ProductId> {
    mix.iter()
        .find(|component| component.product_name.eq_ignore_ascii_case(name))
        .map(|component| component.product_id)
}

fn lines_from_allocation(
    allocated: &BTreeMap<ProductId, i32>,
    mix: &[MixComponent],
) -> Vec<DemandLine> {
    mix.iter()
        .filter_map(|component| {
            allocated.get(&component.product_id).map(|&quantity| DemandLine {
                product_id: component.product_id,
                product_name: component.product_name.clone(),
                quantity,
            })
        })
        .collect()
}

fn even_fallback_lines(total_quantity: i32, mix: &[MixComponent]) -> Vec<DemandLine> {
    let products: Vec<ProductId> = mix.iter().map(|component| component.product_id).collect();
    let allocated = allocation::allocate_even(total_quantity, &products);
    lines_from_allocation(&allocated, mix)
}

/// Resolve one order's demand lines.
///
/// Returns the lines plus an optional degradation note when the fallback
/// even distribution was used.
fn resolve_order_demand(order: &Order, mix: &[MixComponent]) -> (Vec<DemandLine>, Option<String>) {
    match DemandSource::for_order(order, mix) {
        DemandSource::Custom(items) if !items.is_empty() => {
            let lines = items
                .iter()
                .filter(|item| item.quantity > 0)
                .filter_map(|item| {
                    let product_id = item
                        .product_id
                        .or_else(|| lookup_by_name(mix, &item.product_name))?;
                    Some(DemandLine {
                        product_id,
                        product_name: item.product_name.clone(),
                        quantity: item.quantity,
                    })
                })
                .collect();
            (lines, None)
        }
        DemandSource::Custom(_) => (
            even_fallback_lines(order.total_quantity, mix),
            Some(format!(
                "order {} is custom with no item list; used even distribution",
                order.id
            )),
        ),
        DemandSource::Standard(components) => {
            if allocation::mix_is_usable(components) {
                let allocated = allocation::allocate(order.total_quantity, components);
                (lines_from_allocation(&allocated, components), None)
            } else {
                (
                    even_fallback_lines(order.total_quantity, components),
                    Some(format!(
                        "mix configuration unusable; order {} used even distribution",
                        order.id
                    )),
                )
            }
        }
    }
}

/// Resolve and aggregate demand for a whole batch.
#[must_use]
pub fn build_demand_plan(orders: &[Order], mix: &[MixComponent]) -> DemandPlan {
    let mut per_order = Vec::with_capacity(orders.len());
    let mut totals: BTreeMap<ProductId, AggregateDemand> = BTreeMap::new();
    let mut degradations = Vec::new();

    for order in orders {
        let (lines, degradation) = resolve_order_demand(order, mix);
        if let Some(note) = degradation {
            degradations.push(note);
        }
        for line in &lines {
            totals
                .entry(line.product_id)
                .and_modify(|aggregate| aggregate.quantity += i64::from(line.quantity))
                .or_insert_with(|| AggregateDemand {
                    product_name: line.product_name.clone(),
                    quantity: i64::from(line.quantity),
                });
        }
        per_order.push(OrderDemand {
            order_id: order.id,
            lines,
        });
    }

    DemandPlan {
        per_order,
        totals,
        degradations,
    }
}

// =============================================================================
// Store seam
// =============================================================================

/// Everything the validator executes against one order once authorized.
#[derive(Debug, Clone)]
pub struct OrderReservation {
    /// Order being confirmed.
    pub order_id: OrderId,
    /// Client the operation is for.
    pub client_id: ClientId,
    /// Order total, recorded in the history entry.
    pub total_quantity: i32,
    /// Pipeline position before confirmation.
    pub prior_sub_status: OrderSubStatus,
    /// Resolved items; one debit movement is written per item.
    pub items: Vec<RecordItem>,
}

/// Persistence seam for the reservation validator.
pub trait ReservationStore: Send + Sync {
    /// Whether a confirmation of this kind already wrote movements for the order.
    fn movement_exists(
        &self,
        kind: OperationKind,
        order_id: OrderId,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;

    /// The active mix configuration.
    fn active_mix(&self) -> impl Future<Output = Result<Vec<MixComponent>, RepositoryError>> + Send;

    /// Execute an authorized reservation: write every debit movement and the
    /// matching history entries in one transaction.
    fn execute(
        &self,
        kind: OperationKind,
        reservations: Vec<OrderReservation>,
    ) -> impl Future<Output = Result<Vec<DeliveryRecord>, RepositoryError>> + Send;
}

/// `PostgreSQL`-backed reservation store.
#[derive(Clone)]
pub struct PgReservationStore {
    pool: PgPool,
}

impl PgReservationStore {
    /// Create a database-backed reservation store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReservationStore for PgReservationStore {
    async fn movement_exists(
        &self,
        kind: OperationKind,
        order_id: OrderId,
    ) -> Result<bool, RepositoryError> {
        StockRepository::new(&self.pool)
            .movement_exists(kind, order_id)
            .await
    }

    async fn active_mix(&self) -> Result<Vec<MixComponent>, RepositoryError> {
        crate::db::MixConfigRepository::new(&self.pool)
            .active_components()
            .await
    }

    async fn execute(
        &self,
        kind: OperationKind,
        reservations: Vec<OrderReservation>,
    ) -> Result<Vec<DeliveryRecord>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut records = Vec::with_capacity(reservations.len());

        for reservation in &reservations {
            for item in &reservation.items {
                StockRepository::insert_debit(
                    &mut tx,
                    kind,
                    reservation.order_id,
                    item.product_id,
                    item.quantity,
                )
                .await?;
            }
            let record = DeliveryRecorder::record(
                &mut tx,
                reservation.client_id,
                reservation.order_id,
                kind,
                reservation.total_quantity,
                &reservation.items,
                reservation.prior_sub_status,
            )
            .await?;
            records.push(record);
        }

        tx.commit().await?;
        Ok(records)
    }
}

// =============================================================================
// Validator
// =============================================================================

/// Authorizes and executes stock-affecting operations.
pub struct ReservationValidator<S, G> {
    store: S,
    gateway: G,
    cache: DemandCache,
    events: EventBus,
}

impl<S, G> ReservationValidator<S, G>
where
    S: ReservationStore,
    G: BalanceGateway,
{
    /// Create a validator over the given collaborators.
    pub const fn new(store: S, gateway: G, cache: DemandCache, events: EventBus) -> Self {
        Self {
            store,
            gateway,
            cache,
            events,
        }
    }

    /// The demand cache, shared with whoever needs to invalidate it.
    pub const fn cache(&self) -> &DemandCache {
        &self.cache
    }

    /// Authorize a stock-affecting operation for a batch of orders.
    ///
    /// Checks the duplicate guard first, then resolves demand (memoized per
    /// batch composition), then verifies every product's balance. Succeeds
    /// only when no product is short; the returned plan is what `reserve`
    /// executes.
    ///
    /// # Errors
    ///
    /// - `FulfillmentError::DuplicateOperation` if any order was already
    ///   processed for this kind.
    /// - `FulfillmentError::Shortfall` listing every insufficient product.
    /// - `FulfillmentError::Persistence` if a read fails.
    #[instrument(skip(self, orders), fields(batch = orders.len(), kind = %kind))]
    pub async fn validate(
        &self,
        orders: &[Order],
        kind: OperationKind,
    ) -> Result<Arc<DemandPlan>, FulfillmentError> {
        for order in orders {
            if self.store.movement_exists(kind, order.id).await? {
                return Err(FulfillmentError::DuplicateOperation {
                    order_id: order.id,
                    kind,
                });
            }
        }

        let mix = self.store.active_mix().await?;
        let key = BatchKey::for_orders(orders);
        let plan = self
            .cache
            .get_or_compute(key, || async { build_demand_plan(orders, &mix) })
            .await;

        for note in &plan.degradations {
            warn!(reason = %note, "standard allocation degraded to even distribution");
            self.events.publish(FulfillmentEvent::ConfigurationDegraded {
                reason: note.clone(),
            });
        }

        let mut shortfalls = Vec::new();
        for (product_id, demand) in &plan.totals {
            let available = self.gateway.balance(*product_id).await?;
            if available < demand.quantity {
                shortfalls.push(ShortfallLine {
                    product_id: *product_id,
                    product_name: demand.product_name.clone(),
                    needed: demand.quantity,
                    available,
                    missing: demand.quantity - available,
                });
            }
        }

        if !shortfalls.is_empty() {
            return Err(FulfillmentError::Shortfall(ShortfallReport {
                lines: shortfalls,
            }));
        }

        debug!(total_units = plan.total_units(), "batch authorized");
        Ok(plan)
    }

    /// Authorize and execute: on success every debit movement and history
    /// entry is written in one transaction.
    ///
    /// A concurrent duplicate that slips past the fast-path guard aborts on
    /// the movement unique index and surfaces as `DuplicateOperation`.
    ///
    /// # Errors
    ///
    /// Everything `validate` returns, plus `FulfillmentError::Persistence`
    /// if the transaction fails.
    #[instrument(skip(self, orders), fields(batch = orders.len(), kind = %kind))]
    pub async fn reserve(
        &self,
        orders: &[Order],
        kind: OperationKind,
    ) -> Result<Vec<DeliveryRecord>, FulfillmentError> {
        let plan = self.validate(orders, kind).await?;

        let reservations: Vec<OrderReservation> = plan
            .per_order
            .iter()
            .filter(|demand| !demand.lines.is_empty())
            .filter_map(|demand| {
                let order = orders.iter().find(|order| order.id == demand.order_id)?;
                Some(OrderReservation {
                    order_id: demand.order_id,
                    client_id: order.client_id,
                    total_quantity: order.total_quantity,
                    prior_sub_status: order.sub_status,
                    items: demand
                        .lines
                        .iter()
                        .map(|line| RecordItem {
                            product_id: line.product_id,
                            product_name: line.product_name.clone(),
                            quantity: line.quantity,
                        })
                        .collect(),
                })
            })
            .collect();

        match self.store.execute(kind, reservations).await {
            Ok(records) => Ok(records),
            Err(RepositoryError::Conflict(_)) => {
                let order_id = orders.first().map_or(OrderId::new(0), |order| order.id);
                Err(FulfillmentError::DuplicateOperation { order_id, kind })
            }
            Err(e) => Err(e.into()),
        }
    }
}
