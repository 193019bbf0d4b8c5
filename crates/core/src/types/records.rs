//! Records exchanged with Shopify and persisted in the worker's state files.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::CustomerId;

/// A customer as seen in a directory listing.
///
/// Obtained transiently; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRef {
    /// Shopify customer ID.
    pub id: CustomerId,
    /// Current email address (empty when the customer has none).
    pub email: String,
}

/// One currently-suppressed customer and the email to put back.
///
/// Persisted as `{"id": 1, "originalEmail": "a@x.com"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuppressionRecord {
    /// Shopify customer ID.
    pub id: CustomerId,
    /// Email address the customer had before suppression.
    pub original_email: String,
}

/// Billing information reported for a customer by the subscription partner.
///
/// Persisted as `{"nextBillingDate": "2025-06-30", "email": "a@x.com"}`,
/// keyed by customer ID in the billing map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingEntry {
    /// Calendar date of the next renewal in the worker's configured timezone.
    pub next_billing_date: NaiveDate,
    /// Customer email as reported by the partner.
    pub email: String,
}

impl BillingEntry {
    /// Whether the customer renews on `today`.
    #[must_use]
    pub fn is_due_on(&self, today: NaiveDate) -> bool {
        self.next_billing_date == today
    }
}
