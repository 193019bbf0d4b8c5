//! Mailguard Core - Shared domain types.
//!
//! This crate provides the types shared by the Mailguard components:
//! - `mailguard` - Suppression worker (scheduler, webhook receiver, Shopify client)
//! - `cli` - Operator commands for running jobs on demand
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no file access,
//! no HTTP clients. This keeps it lightweight and trivially testable.
//!
//! # Modules
//!
//! - [`types`] - Customer IDs, tag lists, synthetic suppressed addresses, and persisted records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
