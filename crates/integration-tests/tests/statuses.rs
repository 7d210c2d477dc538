//! Status enum contracts consumed by presentation layers.

use std::str::FromStr;

use restock_core::{MixType, OperationKind, OrderStatus, OrderSubStatus};

#[test]
fn test_order_status_values_exist() {
    assert!(matches!(OrderStatus::ToSchedule, OrderStatus::ToSchedule));
    assert!(matches!(OrderStatus::Forecast, OrderStatus::Forecast));
    assert!(matches!(OrderStatus::Scheduled, OrderStatus::Scheduled));
}

#[test]
fn test_sub_status_values_exist() {
    assert!(matches!(OrderSubStatus::Pending, OrderSubStatus::Pending));
    assert!(matches!(OrderSubStatus::Picked, OrderSubStatus::Picked));
    assert!(matches!(OrderSubStatus::Dispatched, OrderSubStatus::Dispatched));
}

#[test]
fn test_status_string_round_trips() {
    for status in [
        OrderStatus::ToSchedule,
        OrderStatus::Forecast,
        OrderStatus::Scheduled,
    ] {
        assert_eq!(OrderStatus::from_str(&status.to_string()).unwrap(), status);
    }
    for kind in [OperationKind::Delivery, OperationKind::Return] {
        assert_eq!(OperationKind::from_str(&kind.to_string()).unwrap(), kind);
    }
}

#[test]
fn test_defaults_match_new_order_shape() {
    assert_eq!(OrderStatus::default(), OrderStatus::ToSchedule);
    assert_eq!(OrderSubStatus::default(), OrderSubStatus::Pending);
    assert_eq!(MixType::default(), MixType::Standard);
}

#[test]
fn test_statuses_are_copy_and_eq() {
    let status = OrderStatus::Scheduled;
    let copied = status;
    assert_eq!(status, copied);
    assert_ne!(OrderSubStatus::Picked, OrderSubStatus::Dispatched);
}
