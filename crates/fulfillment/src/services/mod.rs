//! Service layer for the fulfillment pipeline.
//!
//! - [`allocation`] - proportional and even quantity splitting (pure)
//! - [`cache`] - memoized batch demand with TTL and single-flight
//! - [`gateway`] - collaborator traits (balances, client periodicity)
//! - [`reservation`] - all-or-nothing stock validation and execution
//! - [`recorder`] - append-only delivery/return history
//! - [`schedule`] - reposition date computation
//! - [`fulfillment`] - the order state machine itself

pub mod allocation;
pub mod cache;
pub mod fulfillment;
pub mod gateway;
pub mod recorder;
pub mod reservation;
pub mod schedule;

pub use fulfillment::{BatchOutcome, BatchResult, FulfillmentService, PgFulfillmentService};
pub use reservation::ReservationValidator;
