//! Shopify Admin REST API client with static access-token authentication.

use std::sync::Arc;
use std::time::Duration;

use mailguard_core::{CustomerId, CustomerRef, TagList};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument};
use url::Url;

use super::ShopifyError;
use super::types::{
    CUSTOMER_FIELDS, CustomerEnvelope, CustomerUpdate, CustomerUpdateBody,
    CustomerUpdateEnvelope, CustomersEnvelope, RestCustomer,
};
use crate::config::ShopifyConfig;

/// Largest page size the REST API accepts.
const PAGE_LIMIT: &str = "250";

/// Request timeout for a single API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Shopify Admin REST API client.
///
/// Cheap to clone; clones share the connection pool.
///
/// # Security
///
/// The access token is installed as a sensitive default header and never
/// appears in `Debug` output or logs.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    store: String,
    /// `https://{store}/admin/api/{version}/`
    base_url: Url,
}

/// One page of a customer listing.
#[derive(Debug)]
pub struct CustomerPage {
    pub customers: Vec<RestCustomer>,
    /// URL of the next page, taken from the `Link` header.
    pub next: Option<Url>,
}

impl AdminClient {
    /// Create a new Admin API client.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Config` if the store domain or token cannot be
    /// used to build requests.
    pub fn new(config: &ShopifyConfig) -> Result<Self, ShopifyError> {
        let base_url = Url::parse(&format!(
            "https://{}/admin/api/{}/",
            config.store, config.api_version
        ))?;
        Self::with_base_url(config, base_url)
    }

    /// Create a client against an explicit API base URL (must end with `/`).
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Config` if the token is not a valid header value.
    pub fn with_base_url(config: &ShopifyConfig, base_url: Url) -> Result<Self, ShopifyError> {
        let mut token = HeaderValue::from_str(config.access_token.expose_secret())
            .map_err(|e| ShopifyError::Config(format!("Invalid access token format: {e}")))?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("X-Shopify-Access-Token", token);
        headers.insert("Accept", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            inner: Arc::new(AdminClientInner {
                client,
                store: config.store.clone(),
                base_url,
            }),
        })
    }

    /// Get the store domain.
    #[must_use]
    pub fn store(&self) -> &str {
        &self.inner.store
    }

    // =========================================================================
    // Customer listing
    // =========================================================================

    /// URL of the first page of a tag search.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be joined.
    pub fn tag_search_url(&self, tag: &str) -> Result<Url, ShopifyError> {
        let mut url = self.inner.base_url.join("customers/search.json")?;
        url.query_pairs_mut()
            .append_pair("query", &format!("tag:\"{tag}\""))
            .append_pair("limit", PAGE_LIMIT)
            .append_pair("fields", CUSTOMER_FIELDS);
        Ok(url)
    }

    /// Fetch one page of customers from `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response is not a
    /// customer list.
    #[instrument(skip(self, url), fields(url = %url))]
    pub async fn customers_page(&self, url: Url) -> Result<CustomerPage, ShopifyError> {
        let response = self.inner.client.get(url).send().await?;

        let next = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_page_url);

        let envelope: CustomersEnvelope = Self::handle_response(response).await?;

        Ok(CustomerPage {
            customers: envelope.customers,
            next,
        })
    }

    /// All customers carrying `tag` (case-insensitive, exact tag match).
    ///
    /// Shopify's search is fuzzy, so results are filtered again locally.
    /// Follows `rel="next"` links until exhausted. A failed page fetch ends
    /// the listing early and the customers gathered so far are returned, so
    /// callers must treat the result as best-effort.
    #[instrument(skip(self))]
    pub async fn customers_tagged(&self, tag: &str) -> Vec<CustomerRef> {
        let mut customers = Vec::new();

        let mut next = match self.tag_search_url(tag) {
            Ok(url) => Some(url),
            Err(e) => {
                error!(error = %e, "Failed to build customer search URL");
                None
            }
        };

        let mut pages = 0_usize;
        while let Some(url) = next.take() {
            match self.customers_page(url).await {
                Ok(page) => {
                    pages += 1;
                    customers.extend(
                        page.customers
                            .into_iter()
                            .filter(|c| c.tag_list().contains_ignore_case(tag))
                            .map(CustomerRef::from),
                    );
                    next = page.next;
                }
                Err(e) => {
                    error!(
                        error = %e,
                        pages,
                        collected = customers.len(),
                        "Customer page fetch failed, returning partial list"
                    );
                }
            }
        }

        debug!(pages, count = customers.len(), "Customer listing complete");
        customers
    }

    // =========================================================================
    // Single customer
    // =========================================================================

    /// Get a customer by ID.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::NotFound` if the customer does not exist, or
    /// another error if the request fails.
    #[instrument(skip(self), fields(customer_id = %id))]
    pub async fn get_customer(&self, id: CustomerId) -> Result<RestCustomer, ShopifyError> {
        let mut url = self.customer_url(id)?;
        url.query_pairs_mut().append_pair("fields", CUSTOMER_FIELDS);

        let response = self.inner.client.get(url).send().await?;
        let envelope: CustomerEnvelope = Self::handle_response(response).await?;
        Ok(envelope.customer)
    }

    /// Get a customer's current tags.
    ///
    /// # Errors
    ///
    /// Returns an error if the customer cannot be fetched.
    pub async fn get_tags(&self, id: CustomerId) -> Result<TagList, ShopifyError> {
        Ok(self.get_customer(id).await?.tag_list())
    }

    /// Update a customer. Only fields set in `update` change.
    ///
    /// # Errors
    ///
    /// Returns `ShopifyError::Api` on validation errors (e.g., 422 for an
    /// email that is already taken) or another error if the request fails.
    #[instrument(skip(self, update), fields(customer_id = %id))]
    pub async fn update_customer(
        &self,
        id: CustomerId,
        update: &CustomerUpdate,
    ) -> Result<RestCustomer, ShopifyError> {
        let url = self.customer_url(id)?;
        let body = CustomerUpdateEnvelope {
            customer: CustomerUpdateBody { id, update },
        };

        let response = self.inner.client.put(url).json(&body).send().await?;
        let envelope: CustomerEnvelope = Self::handle_response(response).await?;
        Ok(envelope.customer)
    }

    fn customer_url(&self, id: CustomerId) -> Result<Url, ShopifyError> {
        Ok(self.inner.base_url.join(&format!("customers/{id}.json"))?)
    }

    /// Decode a 2xx body, or turn anything else into a [`ShopifyError`].
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ShopifyError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => {
                ShopifyError::RateLimited(retry_after_secs(response.headers()))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ShopifyError::Unauthorized(
                "token rejected or missing customer scopes".to_string(),
            ),
            StatusCode::NOT_FOUND => ShopifyError::NotFound(response.url().path().to_string()),
            _ => ShopifyError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            },
        })
    }
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("store", &self.inner.store)
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

/// Seconds to wait from a 429's `Retry-After` header, which Shopify sends
/// as a fractional number ("2.0"). Defaults to 2.
fn retry_after_secs(headers: &HeaderMap) -> u64 {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map_or(2, |secs| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let whole = secs.ceil() as u64;
            whole
        })
}

/// Extract the `rel="next"` target from a `Link` header.
///
/// `<https://shop/admin/api/2025-07/customers/search.json?page_info=a>; rel="previous",
///  <https://shop/admin/api/2025-07/customers/search.json?page_info=b>; rel="next"`
fn next_page_url(link: &str) -> Option<Url> {
    let mut rest = link;

    while let Some(start) = rest.find('<') {
        let after = rest.get(start + 1..)?;
        let end = after.find('>')?;
        let target = after.get(..end)?;
        let tail = after.get(end + 1..)?;
        let params_len = tail.find('<').unwrap_or(tail.len());
        let params = tail.get(..params_len)?;

        let is_next = params
            .split(';')
            .map(|p| p.trim().trim_end_matches(',').trim())
            .any(|p| p.eq_ignore_ascii_case(r#"rel="next""#) || p.eq_ignore_ascii_case("rel=next"));
        if is_next {
            return Url::parse(target).ok();
        }

        rest = tail.get(params_len..)?;
    }

    None
}
