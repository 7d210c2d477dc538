//! Status enums for the fulfillment pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing a status string fails.
#[derive(Debug, Error)]
#[error("invalid {kind}: {value}")]
pub struct StatusParseError {
    /// Which status enum was being parsed.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

/// Scheduling status of a recurring order.
///
/// An order cycles through these states forever - it is rescheduled forward
/// after every confirmed delivery or return, never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "fulfillment.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// No date assigned yet.
    #[default]
    ToSchedule,
    /// Date assigned but not yet confirmed into the pipeline.
    Forecast,
    /// Confirmed; the pipeline sub-status applies.
    Scheduled,
}

/// Pipeline position of a `Scheduled` order.
///
/// Only meaningful while [`OrderStatus::Scheduled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "fulfillment.order_sub_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderSubStatus {
    /// Awaiting picking.
    #[default]
    Pending,
    /// Items physically set aside.
    Picked,
    /// Left for delivery.
    Dispatched,
}

/// How an order's product mix is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "fulfillment.mix_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MixType {
    /// Mix derived from the global percentage configuration.
    #[default]
    Standard,
    /// Mix is an explicit client-specified item list.
    Custom,
}

/// Kind of stock-affecting confirmation recorded against an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "fulfillment.operation_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Products delivered to the retail point.
    Delivery,
    /// Products swapped out and replaced.
    Return,
}

/// Direction of a stock ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "fulfillment.movement_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Stock added (production intake, manual adjustment).
    Credit,
    /// Stock consumed (delivery or return replacement).
    Debit,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ToSchedule => write!(f, "to_schedule"),
            Self::Forecast => write!(f, "forecast"),
            Self::Scheduled => write!(f, "scheduled"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "to_schedule" => Ok(Self::ToSchedule),
            "forecast" => Ok(Self::Forecast),
            "scheduled" => Ok(Self::Scheduled),
            _ => Err(StatusParseError {
                kind: "order status",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for OrderSubStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Picked => write!(f, "picked"),
            Self::Dispatched => write!(f, "dispatched"),
        }
    }
}

impl std::str::FromStr for OrderSubStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "picked" => Ok(Self::Picked),
            "dispatched" => Ok(Self::Dispatched),
            _ => Err(StatusParseError {
                kind: "order sub-status",
                value: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Delivery => write!(f, "delivery"),
            Self::Return => write!(f, "return"),
        }
    }
}

impl std::str::FromStr for OperationKind {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delivery" => Ok(Self::Delivery),
            "return" => Ok(Self::Return),
            _ => Err(StatusParseError {
                kind: "operation kind",
                value: s.to_string(),
            }),
        }
    }
}
