//! Full order lifecycle against in-memory collaborators.
//!
//! Exercises the pipeline the way a presentation layer drives it: schedule,
//! confirm, pick, dispatch, confirm delivery, and around again.

use chrono::NaiveDate;

use restock_core::{ClientId, OperationKind, OrderId, OrderStatus, OrderSubStatus, ProductId};
use restock_fulfillment::events::FulfillmentEvent;
use restock_fulfillment::services::FulfillmentService;
use restock_fulfillment::services::ReservationValidator;
use restock_fulfillment::services::cache::DemandCache;
use restock_fulfillment::testing::{InMemoryStore, StaticBalances};
use restock_fulfillment::EventBus;

use restock_integration_tests::{new_order, standard_mix};

type TestService =
    FulfillmentService<InMemoryStore, InMemoryStore, StaticBalances, InMemoryStore>;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn build_service(store: &InMemoryStore, balances: &[(i32, i64)]) -> TestService {
    let events = EventBus::default();
    let validator = ReservationValidator::new(
        store.clone(),
        StaticBalances::new(balances.iter().map(|&(id, b)| (ProductId::new(id), b))),
        DemandCache::default(),
        events.clone(),
    );
    FulfillmentService::new(store.clone(), validator, store.clone(), events)
}

#[tokio::test]
async fn test_full_delivery_cycle() {
    let store = InMemoryStore::with_mix(standard_mix());
    store.set_periodicity(ClientId::new(42), 7);
    let service = build_service(&store, &[(1, 500), (2, 500), (3, 500)]);

    let mut order = new_order(1, 42, 100);

    // Schedule into the forecast, then confirm into the pipeline.
    service
        .schedule(&mut order, date(2024, 3, 4), OrderStatus::Forecast)
        .await
        .unwrap();
    service.confirm(&mut order).await.unwrap();
    assert_eq!(order.status, OrderStatus::Scheduled);
    assert_eq!(order.sub_status, OrderSubStatus::Pending);

    // Walk the pipeline.
    service.pick(&mut order).await.unwrap();
    service.dispatch(&mut order).await.unwrap();
    assert_eq!(order.sub_status, OrderSubStatus::Dispatched);

    // Deliver: stock is debited, history written, order rescheduled.
    let record = service.confirm_delivery(&mut order).await.unwrap();
    assert_eq!(order.status, OrderStatus::Forecast);
    assert_eq!(order.sub_status, OrderSubStatus::Pending);
    assert_eq!(order.scheduled_date, date(2024, 3, 11));

    assert_eq!(record.total_quantity, 100);
    assert_eq!(record.items.len(), 3);
    let delivered: i32 = record.items.iter().map(|item| item.quantity).sum();
    assert_eq!(delivered, 100);

    assert!(store.has_movement(OperationKind::Delivery, OrderId::new(1)));
    assert_eq!(store.record_count(), 1);

    // The next cycle starts from the new date.
    service.confirm(&mut order).await.unwrap();
    assert_eq!(order.status, OrderStatus::Scheduled);
    assert_eq!(order.scheduled_date, date(2024, 3, 11));
}

#[tokio::test]
async fn test_pipeline_events_reach_observers() {
    let store = InMemoryStore::with_mix(standard_mix());
    store.set_periodicity(ClientId::new(42), 7);
    let service = build_service(&store, &[(1, 500), (2, 500), (3, 500)]);
    let mut rx = service.events().subscribe();

    let mut order = new_order(1, 42, 100);
    service
        .schedule(&mut order, date(2024, 3, 4), OrderStatus::Scheduled)
        .await
        .unwrap();
    service.pick(&mut order).await.unwrap();
    service.dispatch(&mut order).await.unwrap();
    service.confirm_delivery(&mut order).await.unwrap();

    let mut transitions = 0;
    let mut deliveries = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            FulfillmentEvent::OrderTransitioned { .. } => transitions += 1,
            FulfillmentEvent::DeliveryConfirmed { next_date, .. } => {
                deliveries += 1;
                assert_eq!(next_date, date(2024, 3, 11));
            }
            FulfillmentEvent::ReturnConfirmed { .. }
            | FulfillmentEvent::ConfigurationDegraded { .. } => {}
        }
    }
    assert_eq!(transitions, 3); // schedule, pick, dispatch
    assert_eq!(deliveries, 1);
}

#[tokio::test]
async fn test_mass_pipeline_batch_cycle() {
    let store = InMemoryStore::with_mix(standard_mix());
    for client in 1..=3 {
        store.set_periodicity(ClientId::new(client), 7);
    }
    let service = build_service(&store, &[(1, 500), (2, 500), (3, 500)]);

    let mut orders: Vec<_> = (1..=3)
        .map(|id| {
            let mut order = new_order(id, id, 50);
            order.status = OrderStatus::Scheduled;
            order.sub_status = OrderSubStatus::Pending;
            order
        })
        .collect();

    let picked = service.mass_pick(&mut orders).await;
    assert!(picked.iter().all(|outcome| outcome.result.is_applied()));

    let dispatched = service.mass_dispatch(&mut orders).await;
    assert!(dispatched.iter().all(|outcome| outcome.result.is_applied()));

    let delivered = service.mass_confirm_delivery(&mut orders).await;
    assert!(delivered.iter().all(|outcome| outcome.result.is_applied()));

    for order in &orders {
        assert_eq!(order.status, OrderStatus::Forecast);
        assert_eq!(order.scheduled_date, date(2024, 3, 11));
    }
    assert_eq!(store.record_count(), 3);
}

#[tokio::test]
async fn test_return_cycle_rolls_to_business_day() {
    let store = InMemoryStore::with_mix(standard_mix());
    let service = build_service(&store, &[(1, 500), (2, 500), (3, 500)]);

    let mut order = new_order(1, 42, 60);
    // Saturday
    service
        .schedule(&mut order, date(2024, 3, 9), OrderStatus::Scheduled)
        .await
        .unwrap();
    service.pick(&mut order).await.unwrap();
    service.dispatch(&mut order).await.unwrap();

    service.confirm_return(&mut order).await.unwrap();

    // Monday, weekend skipped.
    assert_eq!(order.scheduled_date, date(2024, 3, 11));
    assert!(store.has_movement(OperationKind::Return, OrderId::new(1)));
}
