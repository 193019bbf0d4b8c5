//! Shopify customer identifiers.
//!
//! Shopify exposes the same customer under several spellings: the bare numeric
//! REST id (`1234567890`), the GraphQL global id
//! (`gid://shopify/Customer/1234567890`), and whatever path-like string a
//! partner app puts in a webhook. [`CustomerId`] normalizes all of them to the
//! numeric id.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CustomerId`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CustomerIdError {
    /// The input string is empty (or ends with a `/`).
    #[error("customer id cannot be empty")]
    Empty,
    /// The final path segment is not an unsigned integer.
    #[error("customer id must be numeric, got {0:?}")]
    NotNumeric(String),
}

/// A Shopify customer ID.
///
/// Serialized as a bare number; when used as a JSON object key it is written
/// as the decimal string (`"1234567890"`).
///
/// ## Examples
///
/// ```
/// use mailguard_core::CustomerId;
///
/// let id = CustomerId::from_resource_path("gid://shopify/Customer/1234567890").unwrap();
/// assert_eq!(id.as_u64(), 1_234_567_890);
/// assert_eq!(id.to_string(), "1234567890");
///
/// assert!(CustomerId::from_resource_path("gid://shopify/Customer/").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(u64);

impl CustomerId {
    /// Create a new ID from a numeric value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying numeric value.
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Extract the customer ID from the final segment of a path-like identifier.
    ///
    /// Accepts GraphQL global ids, REST resource paths, and bare numbers.
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the final segment is empty or not numeric.
    pub fn from_resource_path(path: &str) -> Result<Self, CustomerIdError> {
        let segment = path.trim().rsplit('/').next().unwrap_or_default();
        segment.parse()
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CustomerId {
    type Err = CustomerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CustomerIdError::Empty);
        }
        s.parse::<u64>()
            .map(Self)
            .map_err(|_| CustomerIdError::NotNumeric(s.to_owned()))
    }
}

impl From<u64> for CustomerId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<CustomerId> for u64 {
    fn from(id: CustomerId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_from_resource_path_gid() {
        let id = CustomerId::from_resource_path("gid://shopify/Customer/1234567890").unwrap();
        assert_eq!(id, CustomerId::new(1_234_567_890));
    }

    #[test]
    fn test_from_resource_path_bare_number() {
        let id = CustomerId::from_resource_path(" 42 ").unwrap();
        assert_eq!(id.as_u64(), 42);
    }

    #[test]
    fn test_from_resource_path_trailing_slash() {
        assert_eq!(
            CustomerId::from_resource_path("gid://shopify/Customer/"),
            Err(CustomerIdError::Empty)
        );
    }

    #[test]
    fn test_from_resource_path_not_numeric() {
        assert!(matches!(
            CustomerId::from_resource_path("gid://shopify/Customer/abc"),
            Err(CustomerIdError::NotNumeric(s)) if s == "abc"
        ));
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&CustomerId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn test_map_key_serializes_as_string() {
        let mut map = BTreeMap::new();
        map.insert(CustomerId::new(1_234_567_890), true);

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"1234567890":true}"#);

        let parsed: BTreeMap<CustomerId, bool> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, map);
    }
}
