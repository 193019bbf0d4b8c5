//! Core types for Mailguard.
//!
//! This module provides type-safe wrappers for the concepts the worker moves
//! between Shopify and its state files.

pub mod id;
pub mod records;
pub mod suppressed;
pub mod tags;

pub use id::{CustomerId, CustomerIdError};
pub use records::{BillingEntry, CustomerRef, SuppressionRecord};
pub use suppressed::{SUPPRESSED_DOMAIN, SuppressedAddress};
pub use tags::TagList;
