//! In-memory collaborator implementations for tests.
//!
//! These mirror the `PostgreSQL`-backed implementations closely enough to
//! exercise the validator and state machine end to end without a database,
//! including the movement-reference uniqueness that backs the duplicate
//! guard.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use restock_core::{ClientId, OperationKind, OrderId, ProductId};

use crate::db::RepositoryError;
use crate::models::mix::MixComponent;
use crate::models::order::Order;
use crate::models::record::DeliveryRecord;
use crate::services::fulfillment::OrderStore;
use crate::services::gateway::{BalanceGateway, ClientDirectory};
use crate::services::reservation::{OrderReservation, ReservationStore};

#[derive(Debug, Default)]
struct InMemoryState {
    mix: Vec<MixComponent>,
    movements: Vec<(OperationKind, OrderId, ProductId, i32)>,
    references: HashSet<(OperationKind, OrderId, ProductId)>,
    records: Vec<DeliveryRecord>,
    persisted: BTreeMap<OrderId, Order>,
    periodicity: BTreeMap<ClientId, i64>,
    fail_next_update: bool,
}

/// Shared in-memory store implementing every persistence seam.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryStore {
    /// Create a store with the given active mix configuration.
    #[must_use]
    pub fn with_mix(mix: Vec<MixComponent>) -> Self {
        let store = Self::default();
        store.lock().mix = mix;
        store
    }

    fn lock(&self) -> MutexGuard<'_, InMemoryState> {
        self.state.lock().expect("in-memory store lock poisoned")
    }

    /// Pretend a confirmation was already processed for an order.
    pub fn mark_processed(&self, kind: OperationKind, order_id: OrderId) {
        self.lock()
            .references
            .insert((kind, order_id, ProductId::new(0)));
    }

    /// Number of debit movements written so far.
    #[must_use]
    pub fn debit_count(&self) -> usize {
        self.lock().movements.len()
    }

    /// Number of history entries written so far.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    /// Whether any movement references the order for this kind.
    #[must_use]
    pub fn has_movement(&self, kind: OperationKind, order_id: OrderId) -> bool {
        self.lock()
            .references
            .iter()
            .any(|&(reference_kind, reference_order, _)| {
                reference_kind == kind && reference_order == order_id
            })
    }

    /// Set a client's delivery periodicity.
    pub fn set_periodicity(&self, client_id: ClientId, days: i64) {
        self.lock().periodicity.insert(client_id, days);
    }

    /// Make the next order persistence write fail.
    pub fn fail_next_update(&self) {
        self.lock().fail_next_update = true;
    }

    /// The last persisted state of an order, if any write succeeded.
    #[must_use]
    pub fn last_persisted(&self, order_id: OrderId) -> Option<Order> {
        self.lock().persisted.get(&order_id).cloned()
    }
}

impl ReservationStore for InMemoryStore {
    async fn movement_exists(
        &self,
        kind: OperationKind,
        order_id: OrderId,
    ) -> Result<bool, RepositoryError> {
        Ok(self.has_movement(kind, order_id))
    }

    async fn active_mix(&self) -> Result<Vec<MixComponent>, RepositoryError> {
        Ok(self.lock().mix.clone())
    }

    async fn execute(
        &self,
        kind: OperationKind,
        reservations: Vec<OrderReservation>,
    ) -> Result<Vec<DeliveryRecord>, RepositoryError> {
        let mut state = self.lock();

        // Emulate the unique index: any conflict aborts the whole batch
        // before a single write lands.
        for reservation in &reservations {
            for item in &reservation.items {
                if state
                    .references
                    .contains(&(kind, reservation.order_id, item.product_id))
                {
                    return Err(RepositoryError::Conflict(format!(
                        "{kind} already recorded for order {}",
                        reservation.order_id
                    )));
                }
            }
        }

        let mut records = Vec::with_capacity(reservations.len());
        for reservation in reservations {
            for item in &reservation.items {
                state
                    .references
                    .insert((kind, reservation.order_id, item.product_id));
                state.movements.push((
                    kind,
                    reservation.order_id,
                    item.product_id,
                    item.quantity,
                ));
            }
            let record = DeliveryRecord {
                id: Uuid::new_v4(),
                client_id: reservation.client_id,
                order_id: reservation.order_id,
                occurred_at: Utc::now(),
                operation_kind: kind,
                total_quantity: reservation.total_quantity,
                items: reservation.items,
                prior_sub_status: reservation.prior_sub_status,
            };
            state.records.push(record.clone());
            records.push(record);
        }
        Ok(records)
    }
}

impl OrderStore for InMemoryStore {
    async fn update_transition(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        if state.fail_next_update {
            state.fail_next_update = false;
            return Err(RepositoryError::Database(sqlx::Error::PoolClosed));
        }
        state.persisted.insert(order.id, order.clone());
        Ok(())
    }
}

impl ClientDirectory for InMemoryStore {
    async fn periodicity_days(&self, client_id: ClientId) -> Result<i64, RepositoryError> {
        self.lock()
            .periodicity
            .get(&client_id)
            .copied()
            .ok_or(RepositoryError::NotFound)
    }
}

/// Fixed per-product balances for validator tests.
#[derive(Debug, Clone, Default)]
pub struct StaticBalances {
    balances: BTreeMap<ProductId, i64>,
}

impl StaticBalances {
    /// Create a gateway answering from the given balances.
    ///
    /// Products without an entry report a balance of zero.
    #[must_use]
    pub fn new(balances: impl IntoIterator<Item = (ProductId, i64)>) -> Self {
        Self {
            balances: balances.into_iter().collect(),
        }
    }
}

impl BalanceGateway for StaticBalances {
    async fn balance(&self, product_id: ProductId) -> Result<i64, RepositoryError> {
        Ok(self.balances.get(&product_id).copied().unwrap_or(0))
    }
}
