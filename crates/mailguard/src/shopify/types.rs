//! Request and response bodies of the customer REST endpoints.

use mailguard_core::{CustomerId, CustomerRef, TagList};
use serde::{Deserialize, Serialize};

/// Customer fields requested from Shopify (`fields=` query parameter).
pub const CUSTOMER_FIELDS: &str = "id,email,tags";

/// A customer as returned by `customers/*.json` with [`CUSTOMER_FIELDS`].
#[derive(Debug, Clone, Deserialize)]
pub struct RestCustomer {
    pub id: CustomerId,
    /// Shopify allows customers without an email (phone-only accounts).
    #[serde(default)]
    pub email: Option<String>,
    /// Comma-separated tag string.
    #[serde(default)]
    pub tags: String,
}

impl RestCustomer {
    /// Parsed tag list.
    #[must_use]
    pub fn tag_list(&self) -> TagList {
        TagList::parse(&self.tags)
    }
}

impl From<RestCustomer> for CustomerRef {
    fn from(customer: RestCustomer) -> Self {
        Self {
            id: customer.id,
            email: customer.email.unwrap_or_default(),
        }
    }
}

/// `{"customers": [...]}`
#[derive(Debug, Deserialize)]
pub(super) struct CustomersEnvelope {
    #[serde(default)]
    pub customers: Vec<RestCustomer>,
}

/// `{"customer": {...}}`
#[derive(Debug, Deserialize)]
pub(super) struct CustomerEnvelope {
    pub customer: RestCustomer,
}

/// Partial customer update. Only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CustomerUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

impl CustomerUpdate {
    /// Replace the customer's email address.
    #[must_use]
    pub fn email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    /// Replace the customer's full tag list.
    #[must_use]
    pub fn tags(tags: &TagList) -> Self {
        Self {
            tags: Some(tags.to_string()),
            ..Self::default()
        }
    }
}

/// `{"customer": {"id": ..., ...update}}`
#[derive(Debug, Serialize)]
pub(super) struct CustomerUpdateEnvelope<'a> {
    pub customer: CustomerUpdateBody<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct CustomerUpdateBody<'a> {
    pub id: CustomerId,
    #[serde(flatten)]
    pub update: &'a CustomerUpdate,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_customer_without_email() {
        let json = r#"{"customers":[{"id":1,"email":null,"tags":""},{"id":2,"email":"b@x.com","tags":"vip, daily subscription"}]}"#;
        let envelope: CustomersEnvelope = serde_json::from_str(json).unwrap();

        assert_eq!(envelope.customers.len(), 2);
        assert!(envelope.customers[0].email.is_none());
        assert!(envelope.customers[1].tag_list().contains("daily subscription"));

        let customer: CustomerRef = envelope.customers[0].clone().into();
        assert_eq!(customer.email, "");
    }

    #[test]
    fn test_serialize_email_update() {
        let update = CustomerUpdate::email("a@x.com");
        let body = CustomerUpdateEnvelope {
            customer: CustomerUpdateBody {
                id: CustomerId::new(7),
                update: &update,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"customer":{"id":7,"email":"a@x.com"}}"#);
    }

    #[test]
    fn test_serialize_tags_update() {
        let update = CustomerUpdate::tags(&TagList::parse("vip,subscription due today"));
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({"tags": "vip, subscription due today"}));
    }
}
