//! Job logic.
//!
//! # Services
//!
//! - `suppression` - Suppress and restore marketing email, with crash recovery
//! - `tagger` - Billing-date tagging of customers

pub mod suppression;
pub mod tagger;

pub use suppression::{
    RestoreOutcome, RestoreReport, RunGuard, SuppressOutcome, SuppressReport,
    SuppressionCoordinator, SuppressionError,
};
pub use tagger::{BillingTagger, TagReport, UntagReport};
