//! In-memory customer directory for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mailguard_core::{CustomerId, CustomerRef, TagList};

use super::CustomerDirectory;
use crate::shopify::ShopifyError;

#[derive(Debug, Clone)]
struct StoredCustomer {
    email: String,
    tags: TagList,
}

#[derive(Debug, Default)]
struct State {
    customers: BTreeMap<CustomerId, StoredCustomer>,
    /// Remaining forced failures per customer, by operation.
    email_failures: HashMap<CustomerId, usize>,
    tag_read_failures: HashMap<CustomerId, usize>,
    tag_write_failures: HashMap<CustomerId, usize>,
    email_writes: Vec<(CustomerId, String)>,
    tag_writes: Vec<(CustomerId, String)>,
}

/// A customer directory held in memory.
///
/// Lists customers in id order, records every write, and can be told to
/// fail a customer's next N calls of a given kind.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
}

impl InMemoryDirectory {
    /// Empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a customer.
    #[must_use]
    pub fn with_customer(self, id: u64, email: &str, tags: &str) -> Self {
        self.insert_customer(CustomerId::new(id), email, tags);
        self
    }

    /// Add (or replace) a customer.
    pub fn insert_customer(&self, id: CustomerId, email: &str, tags: &str) {
        self.lock().customers.insert(
            id,
            StoredCustomer {
                email: email.to_string(),
                tags: TagList::parse(tags),
            },
        );
    }

    /// Current email of a customer.
    #[must_use]
    pub fn email(&self, id: u64) -> Option<String> {
        self.lock()
            .customers
            .get(&CustomerId::new(id))
            .map(|c| c.email.clone())
    }

    /// Current tags of a customer.
    #[must_use]
    pub fn tags(&self, id: u64) -> Option<TagList> {
        self.lock()
            .customers
            .get(&CustomerId::new(id))
            .map(|c| c.tags.clone())
    }

    /// Fail the next `times` email updates for a customer.
    pub fn fail_email_updates(&self, id: u64, times: usize) {
        self.lock()
            .email_failures
            .insert(CustomerId::new(id), times);
    }

    /// Fail the next `times` tag reads for a customer.
    pub fn fail_tag_reads(&self, id: u64, times: usize) {
        self.lock()
            .tag_read_failures
            .insert(CustomerId::new(id), times);
    }

    /// Fail the next `times` tag writes for a customer.
    pub fn fail_tag_writes(&self, id: u64, times: usize) {
        self.lock()
            .tag_write_failures
            .insert(CustomerId::new(id), times);
    }

    /// Every successful email write, in order.
    #[must_use]
    pub fn email_writes(&self) -> Vec<(CustomerId, String)> {
        self.lock().email_writes.clone()
    }

    /// Every successful tag write, in order.
    #[must_use]
    pub fn tag_writes(&self) -> Vec<(CustomerId, String)> {
        self.lock().tag_writes.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Consume one forced failure for `id`, if any are left.
fn take_failure(failures: &mut HashMap<CustomerId, usize>, id: CustomerId) -> bool {
    match failures.get_mut(&id) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            true
        }
        _ => false,
    }
}

fn injected(operation: &str, id: CustomerId) -> ShopifyError {
    ShopifyError::Api {
        status: 503,
        message: format!("injected {operation} failure for customer {id}"),
    }
}

#[async_trait]
impl CustomerDirectory for InMemoryDirectory {
    async fn list_by_tag(&self, tag: &str) -> Vec<CustomerRef> {
        self.lock()
            .customers
            .iter()
            .filter(|(_, c)| c.tags.contains_ignore_case(tag))
            .map(|(id, c)| CustomerRef {
                id: *id,
                email: c.email.clone(),
            })
            .collect()
    }

    async fn get_tags(&self, id: CustomerId) -> Result<TagList, ShopifyError> {
        let mut state = self.lock();
        if take_failure(&mut state.tag_read_failures, id) {
            return Err(injected("get_tags", id));
        }
        state
            .customers
            .get(&id)
            .map(|c| c.tags.clone())
            .ok_or_else(|| ShopifyError::NotFound(format!("customer {id}")))
    }

    async fn set_tags(&self, id: CustomerId, tags: &TagList) -> Result<(), ShopifyError> {
        let mut state = self.lock();
        if take_failure(&mut state.tag_write_failures, id) {
            return Err(injected("set_tags", id));
        }
        let customer = state
            .customers
            .get_mut(&id)
            .ok_or_else(|| ShopifyError::NotFound(format!("customer {id}")))?;
        customer.tags = tags.clone();
        state.tag_writes.push((id, tags.to_string()));
        Ok(())
    }

    async fn set_email(&self, id: CustomerId, email: &str) -> Result<(), ShopifyError> {
        let mut state = self.lock();
        if take_failure(&mut state.email_failures, id) {
            return Err(injected("set_email", id));
        }
        let customer = state
            .customers
            .get_mut(&id)
            .ok_or_else(|| ShopifyError::NotFound(format!("customer {id}")))?;
        customer.email = email.to_string();
        state.email_writes.push((id, email.to_string()));
        Ok(())
    }
}
