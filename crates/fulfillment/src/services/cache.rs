//! Memoization of demand computations per order batch.
//!
//! Keys are structural and order-independent: two batches with the same
//! composition hash identically no matter how the call site ordered them.
//! `moka`'s `get_with` provides the single-flight guarantee - concurrent
//! callers of one key share a single in-flight computation.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::time::MissedTickBehavior;

use restock_core::{MixType, OrderId};

use crate::models::demand::DemandPlan;
use crate::models::order::Order;

/// Default lifetime of a cached demand plan.
pub const DEFAULT_TTL: Duration = Duration::from_secs(120);
/// Default interval between expired-entry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

const MAX_CACHED_BATCHES: u64 = 256;

/// Structural cache key for an order batch.
///
/// Built from the sorted set of `(order, total, mix type)` tuples, so the
/// key ignores batch ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey(Vec<(OrderId, i32, MixType)>);

impl BatchKey {
    /// Derive the key for a batch of orders.
    #[must_use]
    pub fn for_orders(orders: &[Order]) -> Self {
        let mut parts: Vec<(OrderId, i32, MixType)> = orders
            .iter()
            .map(|order| (order.id, order.total_quantity, order.mix_type))
            .collect();
        parts.sort_unstable();
        Self(parts)
    }
}

/// TTL cache for batch demand plans.
#[derive(Clone)]
pub struct DemandCache {
    inner: Cache<BatchKey, Arc<DemandPlan>>,
}

impl DemandCache {
    /// Create a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(MAX_CACHED_BATCHES)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Return the cached plan for `key`, computing it at most once.
    ///
    /// Concurrent callers for the same key await the same computation; no
    /// second computation is spawned while one is in flight.
    pub async fn get_or_compute<F, Fut>(&self, key: BatchKey, compute: F) -> Arc<DemandPlan>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DemandPlan>,
    {
        self.inner
            .get_with(key, async move { Arc::new(compute().await) })
            .await
    }

    /// Drop every cached plan.
    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    /// Spawn the background sweep that evicts expired entries.
    ///
    /// The returned handle can be aborted on shutdown; the sweep otherwise
    /// runs for the life of the process.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.inner.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                cache.run_pending_tasks().await;
            }
        })
    }
}

impl Default for DemandCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{NaiveDate, Utc};
    use restock_core::{ClientId, OrderStatus, OrderSubStatus};

    fn order(id: i32, total: i32, mix_type: MixType) -> Order {
        Order {
            id: OrderId::new(id),
            client_id: ClientId::new(1),
            scheduled_date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            total_quantity: total,
            mix_type,
            status: OrderStatus::Scheduled,
            sub_status: OrderSubStatus::Pending,
            custom_items: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn empty_plan() -> DemandPlan {
        DemandPlan {
            per_order: vec![],
            totals: BTreeMap::new(),
            degradations: vec![],
        }
    }

    #[test]
    fn test_batch_key_ignores_ordering() {
        let a = order(1, 10, MixType::Standard);
        let b = order(2, 20, MixType::Custom);
        let forward = BatchKey::for_orders(&[a.clone(), b.clone()]);
        let reversed = BatchKey::for_orders(&[b, a]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_batch_key_distinguishes_quantities() {
        let key_10 = BatchKey::for_orders(&[order(1, 10, MixType::Standard)]);
        let key_11 = BatchKey::for_orders(&[order(1, 11, MixType::Standard)]);
        assert_ne!(key_10, key_11);
    }

    #[tokio::test]
    async fn test_computation_runs_once_per_key() {
        let cache = DemandCache::default();
        let key = BatchKey::for_orders(&[order(1, 10, MixType::Standard)]);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            cache
                .get_or_compute(key.clone(), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    empty_plan()
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_computation() {
        let cache = DemandCache::default();
        let key = BatchKey::for_orders(&[order(1, 10, MixType::Standard)]);
        let calls = Arc::new(AtomicUsize::new(0));

        let compute = |calls: Arc<AtomicUsize>| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            empty_plan()
        };

        let (left, right) = tokio::join!(
            cache.get_or_compute(key.clone(), || compute(Arc::clone(&calls))),
            cache.get_or_compute(key.clone(), || compute(Arc::clone(&calls))),
        );

        assert_eq!(left, right);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_all_forces_recompute() {
        let cache = DemandCache::default();
        let key = BatchKey::for_orders(&[order(1, 10, MixType::Standard)]);
        let calls = AtomicUsize::new(0);

        cache
            .get_or_compute(key.clone(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                empty_plan()
            })
            .await;
        cache.invalidate_all();
        cache
            .get_or_compute(key, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                empty_plan()
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
