//! Restock Core - Shared types library.
//!
//! This crate provides common types used across all Restock components:
//! - `fulfillment` - Delivery scheduling, stock reservation and order pipeline
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access. This
//! keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs and fulfillment statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
