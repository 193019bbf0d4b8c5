//! Synthetic, non-deliverable email addresses.
//!
//! While a customer is suppressed their Shopify email is replaced with
//! `suppressed-<unix millis>-<customer id>@noemail.fake`. The address is unique
//! per customer and per run, and recognizable without any local state, which
//! is what makes a second suppression run skip customers the first one
//! already handled.

use core::fmt;

use chrono::{DateTime, Utc};

use super::CustomerId;

/// Domain used for every synthetic address. `.fake` is not a delegated TLD.
pub const SUPPRESSED_DOMAIN: &str = "noemail.fake";

const PREFIX: &str = "suppressed-";

/// A parsed synthetic suppressed address.
///
/// ## Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use mailguard_core::{CustomerId, SuppressedAddress};
///
/// let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
/// let address = SuppressedAddress::new(CustomerId::new(42), at);
/// assert_eq!(address.to_string(), "suppressed-1700000000000-42@noemail.fake");
///
/// assert!(SuppressedAddress::matches("suppressed-1700000000000-42@noemail.fake"));
/// assert!(!SuppressedAddress::matches("someone@example.com"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuppressedAddress {
    timestamp_millis: i64,
    customer_id: CustomerId,
}

impl SuppressedAddress {
    /// Build the synthetic address for `customer_id` at time `at`.
    #[must_use]
    pub fn new(customer_id: CustomerId, at: DateTime<Utc>) -> Self {
        Self {
            timestamp_millis: at.timestamp_millis(),
            customer_id,
        }
    }

    /// Parse a synthetic address. Returns `None` for anything else.
    ///
    /// Matching is case-insensitive since Shopify may normalize email case.
    #[must_use]
    pub fn parse(email: &str) -> Option<Self> {
        let lower = email.trim().to_ascii_lowercase();
        let local = lower
            .strip_prefix(PREFIX)?
            .strip_suffix(SUPPRESSED_DOMAIN)?
            .strip_suffix('@')?;
        let (timestamp, id) = local.split_once('-')?;

        if timestamp.is_empty() || !timestamp.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            timestamp_millis: timestamp.parse().ok()?,
            customer_id: id.parse().ok()?,
        })
    }

    /// Whether `email` is a synthetic suppressed address.
    #[must_use]
    pub fn matches(email: &str) -> bool {
        Self::parse(email).is_some()
    }

    /// Customer the address was generated for.
    #[must_use]
    pub const fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Unix timestamp (milliseconds) embedded in the address.
    #[must_use]
    pub const fn timestamp_millis(&self) -> i64 {
        self.timestamp_millis
    }
}

impl fmt::Display for SuppressedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PREFIX}{}-{}@{SUPPRESSED_DOMAIN}",
            self.timestamp_millis, self.customer_id
        )
    }
}
