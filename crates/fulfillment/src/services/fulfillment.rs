//! Order fulfillment state machine.
//!
//! Orchestrates status/sub-status transitions, invokes the reservation
//! validator before any stock-affecting confirmation, and computes the next
//! reposition date. Every transition mutates the caller's in-memory order
//! optimistically; a failed persistence write restores the exact prior
//! sub-state through an explicit revert token.

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::PgPool;
use tokio::task::JoinSet;
use tracing::{error, instrument};

use restock_core::{OperationKind, OrderId, OrderStatus, OrderSubStatus};

use crate::config::FulfillmentConfig;
use crate::db::{OrderRepository, RepositoryError};
use crate::error::FulfillmentError;
use crate::events::{EventBus, FulfillmentEvent};
use crate::models::order::{Order, OrderSnapshot};
use crate::models::record::DeliveryRecord;
use crate::services::cache::DemandCache;
use crate::services::gateway::{
    BalanceGateway, ClientDirectory, LedgerBalanceGateway, PgClientDirectory,
};
use crate::services::reservation::{PgReservationStore, ReservationStore, ReservationValidator};
use crate::services::schedule;

// =============================================================================
// Persistence seam
// =============================================================================

/// Persistence seam for order transition writes.
pub trait OrderStore: Send + Sync {
    /// Persist the outcome of a transition.
    fn update_transition(
        &self,
        order: &Order,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// `PostgreSQL`-backed order store.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    /// Create a database-backed order store.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl OrderStore for PgOrderStore {
    async fn update_transition(&self, order: &Order) -> Result<(), RepositoryError> {
        OrderRepository::new(&self.pool).update_transition(order).await
    }
}

// =============================================================================
// Two-phase transition
// =============================================================================

/// A tentative change to the transition-mutable fields of an order.
///
/// Mix type and custom items have no slot here: no transition touches them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transition {
    /// New reposition date, if the transition moves it.
    pub scheduled_date: Option<NaiveDate>,
    /// New status, if the transition changes it.
    pub status: Option<OrderStatus>,
    /// New sub-status, if the transition changes it.
    pub sub_status: Option<OrderSubStatus>,
}

impl Transition {
    /// Apply the change to the in-memory order, returning the revert token.
    pub fn apply(self, order: &mut Order) -> TransitionToken {
        let token = TransitionToken {
            prior: order.snapshot(),
        };
        if let Some(date) = self.scheduled_date {
            order.scheduled_date = date;
        }
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(sub_status) = self.sub_status {
            order.sub_status = sub_status;
        }
        token
    }
}

/// Undo handle for an optimistically applied transition.
///
/// Dropping the token commits the in-memory change; calling
/// [`TransitionToken::revert`] restores the exact prior sub-state.
#[derive(Debug)]
#[must_use = "dropping the token commits the optimistic mutation"]
pub struct TransitionToken {
    prior: OrderSnapshot,
}

impl TransitionToken {
    /// Restore the order to the state captured when the token was created.
    pub fn revert(self, order: &mut Order) {
        order.restore(self.prior);
    }
}

// =============================================================================
// Batch outcomes
// =============================================================================

/// Per-order result of a batch operation.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Order the outcome is for.
    pub order_id: OrderId,
    /// What happened.
    pub result: BatchResult,
}

/// What happened to one order inside a batch.
#[derive(Debug)]
pub enum BatchResult {
    /// The transition was applied and persisted.
    Applied,
    /// The order was not in the required pre-state; left untouched.
    Skipped,
    /// The transition was attempted and failed; the order is unchanged.
    Failed(String),
}

impl BatchResult {
    /// Whether the transition was applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Whether the order was skipped.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

// =============================================================================
// Service
// =============================================================================

struct ServiceInner<O, S, G, C> {
    orders: O,
    validator: ReservationValidator<S, G>,
    clients: C,
    events: EventBus,
}

/// The fulfillment state machine.
///
/// Cheap to clone; all clones share the same collaborators.
pub struct FulfillmentService<O, S, G, C> {
    inner: Arc<ServiceInner<O, S, G, C>>,
}

impl<O, S, G, C> Clone for FulfillmentService<O, S, G, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Fully database-backed fulfillment service.
pub type PgFulfillmentService =
    FulfillmentService<PgOrderStore, PgReservationStore, LedgerBalanceGateway, PgClientDirectory>;

impl FulfillmentService<PgOrderStore, PgReservationStore, LedgerBalanceGateway, PgClientDirectory> {
    /// Wire every collaborator against one connection pool.
    #[must_use]
    pub fn with_pool(pool: PgPool, config: &FulfillmentConfig) -> Self {
        let events = EventBus::new(config.event_channel_capacity);
        let validator = ReservationValidator::new(
            PgReservationStore::new(pool.clone()),
            LedgerBalanceGateway::new(pool.clone()),
            DemandCache::new(config.demand_cache_ttl),
            events.clone(),
        );
        Self::new(
            PgOrderStore::new(pool.clone()),
            validator,
            PgClientDirectory::new(pool),
            events,
        )
    }
}

impl<O, S, G, C> FulfillmentService<O, S, G, C>
where
    O: OrderStore + 'static,
    S: ReservationStore + 'static,
    G: BalanceGateway + 'static,
    C: ClientDirectory + 'static,
{
    /// Create a service over the given collaborators.
    ///
    /// Pass the same [`EventBus`] to the validator and the service so
    /// observers see configuration degradations alongside transitions.
    pub fn new(
        orders: O,
        validator: ReservationValidator<S, G>,
        clients: C,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                orders,
                validator,
                clients,
                events,
            }),
        }
    }

    /// The event bus observers subscribe to.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    /// Drop every cached demand plan.
    ///
    /// Call after order content (totals, mix, item lists) changes outside
    /// the state machine.
    pub fn invalidate_demand_cache(&self) {
        self.inner.validator.cache().invalidate_all();
    }

    /// Spawn the background sweep that evicts expired demand plans.
    pub fn spawn_cache_sweeper(
        &self,
        interval: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        self.inner.validator.cache().spawn_sweeper(interval)
    }

    // =========================================================================
    // Date assignment
    // =========================================================================

    /// Assign a date to an unscheduled order, moving it to `Forecast` or
    /// directly into the pipeline as `Scheduled`/`Pending`.
    ///
    /// # Errors
    ///
    /// - `FulfillmentError::InvalidTransition` if the order is not `ToSchedule`.
    /// - `FulfillmentError::InvalidOrder` for a bad target or a Custom order
    ///   whose items don't sum to the total (when confirming into the pipeline).
    /// - `FulfillmentError::Persistence` if the write fails (in-memory state
    ///   is reverted).
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn schedule(
        &self,
        order: &mut Order,
        date: NaiveDate,
        target: OrderStatus,
    ) -> Result<(), FulfillmentError> {
        if order.status != OrderStatus::ToSchedule {
            return Err(invalid_transition(order, "schedule"));
        }
        if target == OrderStatus::ToSchedule {
            return Err(FulfillmentError::InvalidOrder(
                "schedule target must be forecast or scheduled".to_string(),
            ));
        }
        if target == OrderStatus::Scheduled && !order.custom_total_matches() {
            return Err(custom_total_mismatch(order));
        }

        let token = Transition {
            scheduled_date: Some(date),
            status: Some(target),
            sub_status: Some(OrderSubStatus::Pending),
        }
        .apply(order);
        self.persist(order, token).await?;
        self.notify_transition(order);
        Ok(())
    }

    /// Confirm a `Forecast` order into the pipeline.
    ///
    /// Date, total, mix type and custom items are carried over unchanged;
    /// only status and sub-status move.
    ///
    /// # Errors
    ///
    /// - `FulfillmentError::InvalidTransition` if the order is not `Forecast`.
    /// - `FulfillmentError::InvalidOrder` if a Custom order's items don't sum
    ///   to the total.
    /// - `FulfillmentError::Persistence` if the write fails (reverted).
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn confirm(&self, order: &mut Order) -> Result<(), FulfillmentError> {
        if order.status != OrderStatus::Forecast {
            return Err(invalid_transition(order, "confirm"));
        }
        if !order.custom_total_matches() {
            return Err(custom_total_mismatch(order));
        }

        let token = Transition {
            status: Some(OrderStatus::Scheduled),
            sub_status: Some(OrderSubStatus::Pending),
            ..Transition::default()
        }
        .apply(order);
        self.persist(order, token).await?;
        self.notify_transition(order);
        Ok(())
    }

    // =========================================================================
    // Pipeline moves (no stock effect, reversible)
    // =========================================================================

    /// Mark the order's items as picked.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless `Scheduled`/`Pending`; `Persistence` on a
    /// failed write (reverted).
    pub async fn pick(&self, order: &mut Order) -> Result<(), FulfillmentError> {
        self.transition_sub_status(order, OrderSubStatus::Pending, OrderSubStatus::Picked, "pick")
            .await
    }

    /// Undo a pick.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless `Scheduled`/`Picked`; `Persistence` on a
    /// failed write (reverted).
    pub async fn undo_pick(&self, order: &mut Order) -> Result<(), FulfillmentError> {
        self.transition_sub_status(
            order,
            OrderSubStatus::Picked,
            OrderSubStatus::Pending,
            "undo pick",
        )
        .await
    }

    /// Mark the order as out for delivery.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless `Scheduled`/`Picked`; `Persistence` on a
    /// failed write (reverted).
    pub async fn dispatch(&self, order: &mut Order) -> Result<(), FulfillmentError> {
        self.transition_sub_status(
            order,
            OrderSubStatus::Picked,
            OrderSubStatus::Dispatched,
            "dispatch",
        )
        .await
    }

    /// Bring a dispatched order back to picking.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless `Scheduled`/`Dispatched`; `Persistence` on
    /// a failed write (reverted).
    pub async fn undo_dispatch(&self, order: &mut Order) -> Result<(), FulfillmentError> {
        self.transition_sub_status(
            order,
            OrderSubStatus::Dispatched,
            OrderSubStatus::Picked,
            "return to picking",
        )
        .await
    }

    // =========================================================================
    // Stock-affecting confirmations
    // =========================================================================

    /// Confirm a dispatched order as delivered.
    ///
    /// The validator authorizes and executes the reservation first; the
    /// order is then rescheduled to its previous date plus the client's
    /// periodicity (never "today plus periodicity") and returned to
    /// `Forecast`/`Pending` with its mix preserved verbatim.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` unless `Scheduled`/`Dispatched`.
    /// - `Shortfall`/`DuplicateOperation` from validation; the order stays
    ///   `Dispatched` and untouched.
    /// - `Persistence` if the client lookup, reservation transaction, or
    ///   order write fails. A failed order write reverts the in-memory order
    ///   but does not roll back the committed reservation; the duplicate
    ///   guard prevents a re-debit on retry.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn confirm_delivery(
        &self,
        order: &mut Order,
    ) -> Result<DeliveryRecord, FulfillmentError> {
        if order.status != OrderStatus::Scheduled || order.sub_status != OrderSubStatus::Dispatched
        {
            return Err(invalid_transition(order, "confirm delivery"));
        }

        let periodicity = self.inner.clients.periodicity_days(order.client_id).await?;
        let record = self.reserve_single(order, OperationKind::Delivery).await?;

        let next_date = schedule::next_delivery_date(order.scheduled_date, periodicity);
        let token = Transition {
            scheduled_date: Some(next_date),
            status: Some(OrderStatus::Forecast),
            sub_status: Some(OrderSubStatus::Pending),
        }
        .apply(order);
        self.persist(order, token).await?;

        self.inner.events.publish(FulfillmentEvent::DeliveryConfirmed {
            order_id: order.id,
            client_id: order.client_id,
            next_date,
        });
        Ok(record)
    }

    /// Confirm a dispatched order as returned.
    ///
    /// Same validation and preservation rules as a delivery; the order is
    /// rescheduled to the first business day strictly after its previous
    /// date.
    ///
    /// # Errors
    ///
    /// As [`FulfillmentService::confirm_delivery`].
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub async fn confirm_return(
        &self,
        order: &mut Order,
    ) -> Result<DeliveryRecord, FulfillmentError> {
        if order.status != OrderStatus::Scheduled || order.sub_status != OrderSubStatus::Dispatched
        {
            return Err(invalid_transition(order, "confirm return"));
        }

        let record = self.reserve_single(order, OperationKind::Return).await?;

        let next_date = schedule::next_business_day(order.scheduled_date);
        let token = Transition {
            scheduled_date: Some(next_date),
            status: Some(OrderStatus::Forecast),
            sub_status: Some(OrderSubStatus::Pending),
        }
        .apply(order);
        self.persist(order, token).await?;

        self.inner.events.publish(FulfillmentEvent::ReturnConfirmed {
            order_id: order.id,
            client_id: order.client_id,
            next_date,
        });
        Ok(record)
    }

    // =========================================================================
    // Batch operations
    // =========================================================================

    /// Pick every `Pending` order in the set.
    ///
    /// Orders not currently `Scheduled`/`Pending` are skipped, not errored.
    /// Per-order writes run concurrently; each outcome is independent and no
    /// failed order is retried.
    pub async fn mass_pick(&self, orders: &mut [Order]) -> Vec<BatchOutcome> {
        self.mass_sub_status(orders, OrderSubStatus::Pending, OrderSubStatus::Picked, "pick")
            .await
    }

    /// Dispatch every `Picked` order in the set.
    ///
    /// Same skip and independence semantics as [`FulfillmentService::mass_pick`].
    pub async fn mass_dispatch(&self, orders: &mut [Order]) -> Vec<BatchOutcome> {
        self.mass_sub_status(
            orders,
            OrderSubStatus::Picked,
            OrderSubStatus::Dispatched,
            "dispatch",
        )
        .await
    }

    /// Confirm every `Dispatched` order in the set as delivered.
    ///
    /// Each order is validated and reserved independently; a shortfall or
    /// duplicate on one order does not affect the others.
    pub async fn mass_confirm_delivery(&self, orders: &mut [Order]) -> Vec<BatchOutcome> {
        self.mass_confirm(orders, OperationKind::Delivery).await
    }

    /// Confirm every `Dispatched` order in the set as returned.
    ///
    /// Same semantics as [`FulfillmentService::mass_confirm_delivery`].
    pub async fn mass_confirm_return(&self, orders: &mut [Order]) -> Vec<BatchOutcome> {
        self.mass_confirm(orders, OperationKind::Return).await
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn transition_sub_status(
        &self,
        order: &mut Order,
        from: OrderSubStatus,
        to: OrderSubStatus,
        action: &'static str,
    ) -> Result<(), FulfillmentError> {
        if order.status != OrderStatus::Scheduled || order.sub_status != from {
            return Err(invalid_transition(order, action));
        }

        let token = Transition {
            sub_status: Some(to),
            ..Transition::default()
        }
        .apply(order);
        self.persist(order, token).await?;
        self.notify_transition(order);
        Ok(())
    }

    async fn reserve_single(
        &self,
        order: &Order,
        kind: OperationKind,
    ) -> Result<DeliveryRecord, FulfillmentError> {
        let records = self
            .inner
            .validator
            .reserve(std::slice::from_ref(order), kind)
            .await?;
        records.into_iter().next().ok_or_else(|| {
            FulfillmentError::InvalidOrder(format!(
                "order {} produced no reservable demand",
                order.id
            ))
        })
    }

    /// Persist an optimistically applied transition, reverting on failure.
    async fn persist(
        &self,
        order: &mut Order,
        token: TransitionToken,
    ) -> Result<(), FulfillmentError> {
        if let Err(e) = self.inner.orders.update_transition(order).await {
            token.revert(order);
            return Err(e.into());
        }
        Ok(())
    }

    fn notify_transition(&self, order: &Order) {
        self.inner.events.publish(FulfillmentEvent::OrderTransitioned {
            order_id: order.id,
            status: order.status,
            sub_status: order.sub_status,
        });
    }

    async fn mass_sub_status(
        &self,
        orders: &mut [Order],
        from: OrderSubStatus,
        to: OrderSubStatus,
        action: &'static str,
    ) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(orders.len());
        let mut tasks: JoinSet<(usize, Order, Result<(), FulfillmentError>)> = JoinSet::new();

        for (index, order) in orders.iter().enumerate() {
            if order.status != OrderStatus::Scheduled || order.sub_status != from {
                outcomes.push(BatchOutcome {
                    order_id: order.id,
                    result: BatchResult::Skipped,
                });
                continue;
            }
            let service = self.clone();
            let mut candidate = order.clone();
            tasks.spawn(async move {
                let result = service
                    .transition_sub_status(&mut candidate, from, to, action)
                    .await;
                (index, candidate, result)
            });
        }

        collect_batch(orders, tasks, &mut outcomes).await;
        outcomes
    }

    async fn mass_confirm(&self, orders: &mut [Order], kind: OperationKind) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(orders.len());
        let mut tasks: JoinSet<(usize, Order, Result<(), FulfillmentError>)> = JoinSet::new();

        for (index, order) in orders.iter().enumerate() {
            if order.status != OrderStatus::Scheduled
                || order.sub_status != OrderSubStatus::Dispatched
            {
                outcomes.push(BatchOutcome {
                    order_id: order.id,
                    result: BatchResult::Skipped,
                });
                continue;
            }
            let service = self.clone();
            let mut candidate = order.clone();
            tasks.spawn(async move {
                let result = match kind {
                    OperationKind::Delivery => {
                        service.confirm_delivery(&mut candidate).await.map(drop)
                    }
                    OperationKind::Return => service.confirm_return(&mut candidate).await.map(drop),
                };
                (index, candidate, result)
            });
        }

        collect_batch(orders, tasks, &mut outcomes).await;
        outcomes
    }
}

/// Drain a batch's tasks, writing successful candidates back into the slice.
async fn collect_batch(
    orders: &mut [Order],
    mut tasks: JoinSet<(usize, Order, Result<(), FulfillmentError>)>,
    outcomes: &mut Vec<BatchOutcome>,
) {
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((index, candidate, result)) => {
                let order_id = candidate.id;
                match result {
                    Ok(()) => {
                        if let Some(slot) = orders.get_mut(index) {
                            *slot = candidate;
                        }
                        outcomes.push(BatchOutcome {
                            order_id,
                            result: BatchResult::Applied,
                        });
                    }
                    Err(e) => outcomes.push(BatchOutcome {
                        order_id,
                        result: BatchResult::Failed(e.to_string()),
                    }),
                }
            }
            Err(join_error) => {
                error!(error = %join_error, "batch task failed to join");
            }
        }
    }
}

fn invalid_transition(order: &Order, action: &'static str) -> FulfillmentError {
    FulfillmentError::InvalidTransition {
        order_id: order.id,
        status: order.status,
        sub_status: order.sub_status,
        action,
    }
}

fn custom_total_mismatch(order: &Order) -> FulfillmentError {
    FulfillmentError::InvalidOrder(format!(
        "custom items sum to {} but order total is {}",
        order.custom_items_total(),
        order.total_quantity
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use restock_core::{ClientId, MixComponentId, MixType, ProductId};

    use crate::models::mix::MixComponent;
    use crate::models::order::CustomItem;
    use crate::testing::{InMemoryStore, StaticBalances};

    type TestService = FulfillmentService<InMemoryStore, InMemoryStore, StaticBalances, InMemoryStore>;

    fn component(id: i32, name: &str, percentage: &str) -> MixComponent {
        MixComponent {
            id: MixComponentId::new(id),
            product_id: ProductId::new(id),
            product_name: name.to_string(),
            percentage: percentage.parse().unwrap(),
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn standard_mix() -> Vec<MixComponent> {
        vec![
            component(1, "Wheat Loaf", "60"),
            component(2, "Rye Loaf", "25"),
            component(3, "Multigrain", "15"),
        ]
    }

    fn service_with(store: &InMemoryStore, balances: &[(i32, i64)]) -> TestService {
        let events = EventBus::default();
        let validator = ReservationValidator::new(
            store.clone(),
            StaticBalances::new(balances.iter().map(|&(id, b)| (ProductId::new(id), b))),
            DemandCache::default(),
            events.clone(),
        );
        FulfillmentService::new(store.clone(), validator, store.clone(), events)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dispatched_order(id: i32, client: i32, total: i32) -> Order {
        Order {
            id: OrderId::new(id),
            client_id: ClientId::new(client),
            scheduled_date: date(2024, 3, 4),
            total_quantity: total,
            mix_type: MixType::Standard,
            status: OrderStatus::Scheduled,
            sub_status: OrderSubStatus::Dispatched,
            custom_items: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // -------------------------------------------------------------------------
    // Delivery confirmation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_confirm_delivery_reschedules_from_previous_date() {
        let store = InMemoryStore::with_mix(standard_mix());
        store.set_periodicity(ClientId::new(7), 7);
        let service = service_with(&store, &[(1, 100), (2, 100), (3, 100)]);

        let mut order = dispatched_order(1, 7, 100);
        let record = service.confirm_delivery(&mut order).await.unwrap();

        // Anchored on the previous scheduled date, not the wall clock.
        assert_eq!(order.scheduled_date, date(2024, 3, 11));
        assert_eq!(order.status, OrderStatus::Forecast);
        assert_eq!(order.sub_status, OrderSubStatus::Pending);
        assert_eq!(record.operation_kind, OperationKind::Delivery);
        assert_eq!(record.prior_sub_status, OrderSubStatus::Dispatched);

        let persisted = store.last_persisted(OrderId::new(1)).unwrap();
        assert_eq!(persisted.scheduled_date, date(2024, 3, 11));
        assert_eq!(persisted.status, OrderStatus::Forecast);
    }

    #[tokio::test]
    async fn test_confirm_delivery_preserves_custom_items() {
        let store = InMemoryStore::with_mix(standard_mix());
        store.set_periodicity(ClientId::new(7), 14);
        let service = service_with(&store, &[(1, 100), (2, 100)]);

        let items = vec![
            CustomItem {
                product_id: Some(ProductId::new(1)),
                product_name: "Wheat Loaf".to_string(),
                quantity: 6,
            },
            CustomItem {
                product_id: Some(ProductId::new(2)),
                product_name: "Rye Loaf".to_string(),
                quantity: 4,
            },
        ];
        let mut order = dispatched_order(1, 7, 10);
        order.mix_type = MixType::Custom;
        order.custom_items.clone_from(&items);

        service.confirm_delivery(&mut order).await.unwrap();

        assert_eq!(order.mix_type, MixType::Custom);
        assert_eq!(order.custom_items, items);
        assert_eq!(order.scheduled_date, date(2024, 3, 18));

        let persisted = store.last_persisted(OrderId::new(1)).unwrap();
        assert_eq!(persisted.custom_items, items);
        assert_eq!(persisted.mix_type, MixType::Custom);
    }

    #[tokio::test]
    async fn test_double_confirm_delivery_is_duplicate() {
        let store = InMemoryStore::with_mix(standard_mix());
        store.set_periodicity(ClientId::new(7), 7);
        let service = service_with(&store, &[(1, 1000), (2, 1000), (3, 1000)]);

        let mut order = dispatched_order(1, 7, 100);
        let mut stale = order.clone();

        service.confirm_delivery(&mut order).await.unwrap();
        let debits_after_first = store.debit_count();

        // A second confirmation against the stale dispatched state.
        let err = service.confirm_delivery(&mut stale).await.unwrap_err();

        assert!(matches!(
            err,
            FulfillmentError::DuplicateOperation { order_id, kind }
                if order_id == OrderId::new(1) && kind == OperationKind::Delivery
        ));
        // Zero additional debits, and the stale order was left untouched.
        assert_eq!(store.debit_count(), debits_after_first);
        assert_eq!(stale.sub_status, OrderSubStatus::Dispatched);
    }

    #[tokio::test]
    async fn test_shortfall_leaves_order_dispatched() {
        let store = InMemoryStore::with_mix(standard_mix());
        store.set_periodicity(ClientId::new(7), 7);
        let service = service_with(&store, &[(1, 10), (2, 10), (3, 10)]);

        let mut order = dispatched_order(1, 7, 100);
        let err = service.confirm_delivery(&mut order).await.unwrap_err();

        assert!(matches!(err, FulfillmentError::Shortfall(_)));
        assert_eq!(order.status, OrderStatus::Scheduled);
        assert_eq!(order.sub_status, OrderSubStatus::Dispatched);
        assert_eq!(order.scheduled_date, date(2024, 3, 4));
        assert_eq!(store.debit_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_periodicity_fails_before_reserving() {
        let store = InMemoryStore::with_mix(standard_mix());
        let service = service_with(&store, &[(1, 100), (2, 100), (3, 100)]);

        let mut order = dispatched_order(1, 7, 100);
        let err = service.confirm_delivery(&mut order).await.unwrap_err();

        assert!(matches!(err, FulfillmentError::Persistence(_)));
        assert_eq!(store.debit_count(), 0);
        assert_eq!(order.sub_status, OrderSubStatus::Dispatched);
    }

    #[tokio::test]
    async fn test_order_write_failure_reverts_memory_but_keeps_reservation() {
        let store = InMemoryStore::with_mix(standard_mix());
        store.set_periodicity(ClientId::new(7), 7);
        let service = service_with(&store, &[(1, 100), (2, 100), (3, 100)]);

        let mut order = dispatched_order(1, 7, 100);
        store.fail_next_update();
        let err = service.confirm_delivery(&mut order).await.unwrap_err();

        assert!(matches!(err, FulfillmentError::Persistence(_)));
        // The in-memory order is restored exactly.
        assert_eq!(order.status, OrderStatus::Scheduled);
        assert_eq!(order.sub_status, OrderSubStatus::Dispatched);
        assert_eq!(order.scheduled_date, date(2024, 3, 4));
        // The reservation transaction already committed; the duplicate guard
        // stops a retry from debiting again.
        assert_eq!(store.debit_count(), 3);
        let retry = service.confirm_delivery(&mut order).await.unwrap_err();
        assert!(matches!(retry, FulfillmentError::DuplicateOperation { .. }));
        assert_eq!(store.debit_count(), 3);
    }

    // -------------------------------------------------------------------------
    // Return confirmation
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_confirm_return_schedules_next_business_day() {
        let store = InMemoryStore::with_mix(standard_mix());
        let service = service_with(&store, &[(1, 100), (2, 100), (3, 100)]);

        // Friday
        let mut order = dispatched_order(1, 7, 100);
        order.scheduled_date = date(2024, 3, 8);

        let record = service.confirm_return(&mut order).await.unwrap();

        // Monday, weekend skipped.
        assert_eq!(order.scheduled_date, date(2024, 3, 11));
        assert_eq!(order.status, OrderStatus::Forecast);
        assert_eq!(order.sub_status, OrderSubStatus::Pending);
        assert_eq!(record.operation_kind, OperationKind::Return);
        assert!(store.has_movement(OperationKind::Return, OrderId::new(1)));
    }

    // -------------------------------------------------------------------------
    // Pipeline moves
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_pick_dispatch_round_trip() {
        let store = InMemoryStore::with_mix(standard_mix());
        let service = service_with(&store, &[]);

        let mut order = dispatched_order(1, 7, 100);
        order.sub_status = OrderSubStatus::Pending;

        service.pick(&mut order).await.unwrap();
        assert_eq!(order.sub_status, OrderSubStatus::Picked);

        service.dispatch(&mut order).await.unwrap();
        assert_eq!(order.sub_status, OrderSubStatus::Dispatched);

        service.undo_dispatch(&mut order).await.unwrap();
        assert_eq!(order.sub_status, OrderSubStatus::Picked);

        service.undo_pick(&mut order).await.unwrap();
        assert_eq!(order.sub_status, OrderSubStatus::Pending);

        // None of these touch stock.
        assert_eq!(store.debit_count(), 0);
    }

    #[tokio::test]
    async fn test_pick_requires_pending() {
        let store = InMemoryStore::default();
        let service = service_with(&store, &[]);

        let mut order = dispatched_order(1, 7, 100);
        let err = service.pick(&mut order).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::InvalidTransition { action: "pick", .. }));
        assert_eq!(order.sub_status, OrderSubStatus::Dispatched);
    }

    #[tokio::test]
    async fn test_failed_write_reverts_pick() {
        let store = InMemoryStore::default();
        let service = service_with(&store, &[]);

        let mut order = dispatched_order(1, 7, 100);
        order.sub_status = OrderSubStatus::Pending;

        store.fail_next_update();
        let err = service.pick(&mut order).await.unwrap_err();

        assert!(matches!(err, FulfillmentError::Persistence(_)));
        assert_eq!(order.sub_status, OrderSubStatus::Pending);
        assert!(store.last_persisted(OrderId::new(1)).is_none());
    }

    // -------------------------------------------------------------------------
    // Date assignment
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_schedule_into_forecast() {
        let store = InMemoryStore::default();
        let service = service_with(&store, &[]);

        let mut order = dispatched_order(1, 7, 100);
        order.status = OrderStatus::ToSchedule;

        service
            .schedule(&mut order, date(2024, 4, 1), OrderStatus::Forecast)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Forecast);
        assert_eq!(order.scheduled_date, date(2024, 4, 1));
    }

    #[tokio::test]
    async fn test_schedule_directly_into_pipeline() {
        let store = InMemoryStore::default();
        let service = service_with(&store, &[]);

        let mut order = dispatched_order(1, 7, 100);
        order.status = OrderStatus::ToSchedule;

        service
            .schedule(&mut order, date(2024, 4, 1), OrderStatus::Scheduled)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Scheduled);
        assert_eq!(order.sub_status, OrderSubStatus::Pending);
    }

    #[tokio::test]
    async fn test_confirm_rejects_custom_total_mismatch() {
        let store = InMemoryStore::default();
        let service = service_with(&store, &[]);

        let mut order = dispatched_order(1, 7, 10);
        order.status = OrderStatus::Forecast;
        order.mix_type = MixType::Custom;
        order.custom_items = vec![CustomItem {
            product_id: Some(ProductId::new(1)),
            product_name: "Wheat Loaf".to_string(),
            quantity: 3,
        }];

        let err = service.confirm(&mut order).await.unwrap_err();
        assert!(matches!(err, FulfillmentError::InvalidOrder(_)));
        assert_eq!(order.status, OrderStatus::Forecast);
    }

    // -------------------------------------------------------------------------
    // Batch operations
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_mass_pick_only_transitions_pending() {
        let store = InMemoryStore::with_mix(standard_mix());
        let service = service_with(&store, &[]);

        let mut orders = vec![
            dispatched_order(1, 7, 100),
            dispatched_order(2, 8, 100),
            dispatched_order(3, 9, 100),
        ];
        orders[0].sub_status = OrderSubStatus::Pending;
        orders[1].sub_status = OrderSubStatus::Picked;
        // orders[2] stays Dispatched.

        let outcomes = service.mass_pick(&mut orders).await;

        assert_eq!(orders[0].sub_status, OrderSubStatus::Picked);
        assert_eq!(orders[1].sub_status, OrderSubStatus::Picked);
        assert_eq!(orders[2].sub_status, OrderSubStatus::Dispatched);

        let applied: Vec<OrderId> = outcomes
            .iter()
            .filter(|outcome| outcome.result.is_applied())
            .map(|outcome| outcome.order_id)
            .collect();
        let skipped: Vec<OrderId> = outcomes
            .iter()
            .filter(|outcome| outcome.result.is_skipped())
            .map(|outcome| outcome.order_id)
            .collect();
        assert_eq!(applied, vec![OrderId::new(1)]);
        assert_eq!(skipped.len(), 2);
    }

    #[tokio::test]
    async fn test_mass_confirm_delivery_outcomes_are_independent() {
        let store = InMemoryStore::with_mix(standard_mix());
        store.set_periodicity(ClientId::new(7), 7);
        store.set_periodicity(ClientId::new(8), 7);
        let service = service_with(&store, &[(1, 1000), (2, 1000), (3, 1000)]);

        // Order 2 was already processed; order 1 should still go through.
        store.mark_processed(OperationKind::Delivery, OrderId::new(2));

        let mut orders = vec![dispatched_order(1, 7, 100), dispatched_order(2, 8, 100)];
        let outcomes = service.mass_confirm_delivery(&mut orders).await;

        let first = outcomes
            .iter()
            .find(|outcome| outcome.order_id == OrderId::new(1))
            .unwrap();
        let second = outcomes
            .iter()
            .find(|outcome| outcome.order_id == OrderId::new(2))
            .unwrap();

        assert!(first.result.is_applied());
        assert!(matches!(&second.result, BatchResult::Failed(reason) if reason.contains("already processed")));

        assert_eq!(orders[0].status, OrderStatus::Forecast);
        assert_eq!(orders[1].sub_status, OrderSubStatus::Dispatched);
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_delivery_confirmation_publishes_event() {
        let store = InMemoryStore::with_mix(standard_mix());
        store.set_periodicity(ClientId::new(7), 7);
        let service = service_with(&store, &[(1, 100), (2, 100), (3, 100)]);
        let mut rx = service.events().subscribe();

        let mut order = dispatched_order(1, 7, 100);
        service.confirm_delivery(&mut order).await.unwrap();

        match rx.try_recv().unwrap() {
            FulfillmentEvent::DeliveryConfirmed {
                order_id,
                next_date,
                ..
            } => {
                assert_eq!(order_id, OrderId::new(1));
                assert_eq!(next_date, date(2024, 3, 11));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
