//! Remote customer directory.
//!
//! [`CustomerDirectory`] is the seam between the jobs and Shopify: the
//! suppression coordinator and billing tagger only ever talk to a
//! `dyn CustomerDirectory`, which is [`AdminClient`] in production and
//! [`InMemoryDirectory`] in tests.

#[cfg(any(test, feature = "test-support"))]
mod memory;
mod retry;

#[cfg(any(test, feature = "test-support"))]
pub use memory::InMemoryDirectory;
pub use retry::with_retry;

use async_trait::async_trait;
use mailguard_core::{CustomerId, CustomerRef, TagList};

use crate::shopify::{AdminClient, CustomerUpdate, ShopifyError};

/// Read/write access to the store's customers.
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// All customers whose tag list contains `tag` (case-insensitive).
    ///
    /// Never fails: if a page cannot be fetched the customers gathered so
    /// far are returned, so the result may be incomplete.
    async fn list_by_tag(&self, tag: &str) -> Vec<CustomerRef>;

    /// A customer's current tags.
    async fn get_tags(&self, id: CustomerId) -> Result<TagList, ShopifyError>;

    /// Replace a customer's full tag list.
    async fn set_tags(&self, id: CustomerId, tags: &TagList) -> Result<(), ShopifyError>;

    /// Replace a customer's email address.
    async fn set_email(&self, id: CustomerId, email: &str) -> Result<(), ShopifyError>;
}

#[async_trait]
impl CustomerDirectory for AdminClient {
    async fn list_by_tag(&self, tag: &str) -> Vec<CustomerRef> {
        self.customers_tagged(tag).await
    }

    async fn get_tags(&self, id: CustomerId) -> Result<TagList, ShopifyError> {
        Self::get_tags(self, id).await
    }

    async fn set_tags(&self, id: CustomerId, tags: &TagList) -> Result<(), ShopifyError> {
        self.update_customer(id, &CustomerUpdate::tags(tags))
            .await
            .map(|_| ())
    }

    async fn set_email(&self, id: CustomerId, email: &str) -> Result<(), ShopifyError> {
        self.update_customer(id, &CustomerUpdate::email(email))
            .await
            .map(|_| ())
    }
}
