//! Restock Fulfillment - recurring delivery scheduling and stock reservation.
//!
//! This crate is the fulfillment subsystem of Restock: it moves a client's
//! recurring order through the picking/dispatch/delivery pipeline, rebuilds
//! the per-product quantity mix from the standard configuration or a
//! client-customized item list, and guarantees that no delivery is ever
//! confirmed against insufficient stock.
//!
//! # Architecture
//!
//! - [`models`] - domain types (orders, mix configuration, ledger, history)
//! - [`db`] - `PostgreSQL` repositories and migrations
//! - [`services`] - allocator, demand cache, reservation validator, recorder,
//!   and the fulfillment state machine
//! - [`events`] - observer notifications for state changes
//! - [`testing`] - in-memory collaborators for exercising the pipeline
//!   without a database
//!
//! The crate is a library: presentation and client/catalog management live
//! elsewhere and consume [`services::FulfillmentService`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod services;
pub mod testing;

pub use config::{ConfigError, FulfillmentConfig};
pub use error::FulfillmentError;
pub use events::{EventBus, FulfillmentEvent};
pub use services::{FulfillmentService, PgFulfillmentService};
