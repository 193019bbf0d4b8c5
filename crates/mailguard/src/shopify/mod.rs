//! Shopify Admin REST API client (HIGH PRIVILEGE).
//!
//! # Security
//!
//! **This module holds the Admin API access token of the store's custom app.**
//!
//! The token only needs `read_customers` and `write_customers`, but Shopify
//! treats it as a full credential: never log it, never expose it over HTTP.
//!
//! # Architecture
//!
//! - Plain REST calls with `reqwest` (customer search, get, update)
//! - Cursor pagination by following the `Link: <...>; rel="next"` header
//! - No retries here; callers wrap calls in [`crate::directory::with_retry`]
//!
//! # Example
//!
//! ```rust,ignore
//! use mailguard::shopify::AdminClient;
//!
//! let client = AdminClient::new(&config.shopify)?;
//!
//! let customers = client.customers_tagged("daily subscription").await;
//! client.update_customer(customers[0].id, &CustomerUpdate::email("a@x.com")).await?;
//! ```

mod client;
pub mod types;

pub use client::{AdminClient, CustomerPage};
pub use types::{CustomerUpdate, RestCustomer};

use thiserror::Error;

/// Errors that can occur when interacting with the Shopify Admin API.
#[derive(Debug, Error)]
pub enum ShopifyError {
    /// HTTP request failed (connect, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Access token missing, revoked, or lacking scopes.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// API returned an error response (e.g., 422 validation errors).
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Client could not be configured.
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shopify_error_display() {
        let err = ShopifyError::NotFound("customer 123".to_string());
        assert_eq!(err.to_string(), "Not found: customer 123");
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ShopifyError::RateLimited(2);
        assert_eq!(err.to_string(), "Rate limited, retry after 2 seconds");
    }

    #[test]
    fn test_api_error() {
        let err = ShopifyError::Api {
            status: 422,
            message: r#"{"errors":{"email":["has already been taken"]}}"#.to_string(),
        };
        assert!(err.to_string().starts_with("API error: 422"));
    }
}
