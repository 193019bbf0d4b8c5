//! Billing-date webhook from the subscription partner.
//!
//! The partner posts flat JSON with namespaced keys:
//!
//! ```json
//! {
//!   "partner::next_billing_date": "2025-06-30",
//!   "partner::customer_email": "a@x.com",
//!   "shopify::customer_id": "gid://shopify/Customer/1234567890"
//! }
//! ```
//!
//! Any problem with the payload or with persisting it is answered with a
//! failure status so the partner retries.

use axum::{Json, body::Bytes, extract::State};
use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;
use mailguard_core::{BillingEntry, CustomerId};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::state::AppState;

pub const FIELD_BILLING_DATE: &str = "partner::next_billing_date";
pub const FIELD_EMAIL: &str = "partner::customer_email";
pub const FIELD_CUSTOMER_ID: &str = "shopify::customer_id";

/// Why a webhook payload was rejected.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("body is not a valid payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("missing field {0}")]
    MissingField(&'static str),

    #[error("unparseable billing date {0:?}")]
    InvalidDate(String),

    #[error("unparseable customer id {0:?}")]
    InvalidCustomerId(String),
}

#[derive(Debug, Deserialize)]
struct BillingDatePayload {
    #[serde(rename = "partner::next_billing_date")]
    next_billing_date: Option<String>,
    #[serde(rename = "partner::customer_email")]
    customer_email: Option<String>,
    #[serde(rename = "shopify::customer_id")]
    customer_id: Option<String>,
}

/// A validated billing-date report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingDateUpdate {
    pub customer_id: CustomerId,
    pub entry: BillingEntry,
}

impl BillingDateUpdate {
    /// Parse a webhook body, reading the date as a calendar day in `timezone`.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError` if the body is not JSON, a field is missing or
    /// the date or customer id cannot be parsed.
    pub fn from_json(body: &[u8], timezone: Tz) -> Result<Self, WebhookError> {
        let payload: BillingDatePayload = serde_json::from_slice(body)?;

        let raw_date = payload
            .next_billing_date
            .ok_or(WebhookError::MissingField(FIELD_BILLING_DATE))?;
        let email = payload
            .customer_email
            .ok_or(WebhookError::MissingField(FIELD_EMAIL))?;
        let raw_id = payload
            .customer_id
            .ok_or(WebhookError::MissingField(FIELD_CUSTOMER_ID))?;

        let next_billing_date = parse_billing_date(&raw_date, timezone)
            .ok_or(WebhookError::InvalidDate(raw_date))?;
        let customer_id = CustomerId::from_resource_path(&raw_id)
            .map_err(|_| WebhookError::InvalidCustomerId(raw_id))?;

        Ok(Self {
            customer_id,
            entry: BillingEntry {
                next_billing_date,
                email,
            },
        })
    }
}

/// Read a billing date as a calendar day in `timezone`.
///
/// Plain dates (`2025-06-30`) are taken as-is; timestamps with an offset
/// (`2025-06-30T03:00:00Z`) are converted to `timezone` first.
#[must_use]
pub fn parse_billing_date(raw: &str, timezone: Tz) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&timezone).date_naive())
}

/// `POST /webhooks/billing-date`
#[instrument(skip(state, body))]
pub async fn billing_date(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let update = BillingDateUpdate::from_json(&body, state.config().schedule.timezone)?;

    state
        .billing()
        .upsert(update.customer_id, update.entry.clone())
        .await?;

    info!(
        customer_id = %update.customer_id,
        next_billing_date = %update.entry.next_billing_date,
        "Billing date recorded"
    );

    Ok(Json(json!({
        "success": true,
        "customerId": update.customer_id.to_string(),
        "nextBillingDate": update.entry.next_billing_date,
    })))
}
