//! Customer tag lists.
//!
//! Shopify's REST API represents a customer's tags as one comma-separated
//! string (`"vip, daily subscription"`). [`TagList`] parses that into trimmed,
//! non-empty tags and renders it back comma-space-joined.

use core::fmt;

/// An ordered list of customer tags.
///
/// Two kinds of lookup exist on purpose: [`TagList::contains`] is an exact
/// match (used before adding a tag), [`TagList::contains_ignore_case`] matches
/// the way Shopify's tag search does.
///
/// ## Examples
///
/// ```
/// use mailguard_core::TagList;
///
/// let mut tags = TagList::parse("vip,  Daily Subscription ,");
/// assert_eq!(tags.len(), 2);
/// assert!(tags.contains_ignore_case("daily subscription"));
/// assert!(!tags.contains("daily subscription"));
///
/// assert!(tags.add("subscription due today"));
/// assert!(!tags.add("subscription due today"));
/// assert_eq!(tags.to_string(), "vip, Daily Subscription, subscription due today");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagList(Vec<String>);

impl TagList {
    /// Parse a comma-separated tag string. Empty segments are dropped.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self(
            raw.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    /// Whether the list contains `tag` exactly (after trimming).
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        let tag = tag.trim();
        self.0.iter().any(|t| t == tag)
    }

    /// Whether the list contains `tag`, ignoring case.
    #[must_use]
    pub fn contains_ignore_case(&self, tag: &str) -> bool {
        let tag = tag.trim();
        self.0.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Append `tag` unless it is already present. Returns whether it was added.
    pub fn add(&mut self, tag: &str) -> bool {
        if self.contains(tag) {
            return false;
        }
        self.0.push(tag.trim().to_owned());
        true
    }

    /// Remove every case-insensitive match of `tag`. Returns how many were removed.
    pub fn remove_ignore_case(&mut self, tag: &str) -> usize {
        let tag = tag.trim();
        let before = self.0.len();
        self.0.retain(|t| !t.eq_ignore_ascii_case(tag));
        before - self.0.len()
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the list has no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the tags in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Consume the list and return the tags.
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for TagList {
    fn from(tags: Vec<String>) -> Self {
        Self(
            tags.into_iter()
                .map(|t| t.trim().to_owned())
                .filter(|t| !t.is_empty())
                .collect(),
        )
    }
}

impl fmt::Display for TagList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_drops_empty() {
        let tags = TagList::parse(" a ,b,, c ,");
        assert_eq!(tags.into_vec(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_empty_string() {
        assert!(TagList::parse("").is_empty());
        assert!(TagList::parse(" , ").is_empty());
    }

    #[test]
    fn test_contains_is_case_sensitive() {
        let tags = TagList::parse("Subscription Due Today");
        assert!(!tags.contains("subscription due today"));
        assert!(tags.contains(" Subscription Due Today "));
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut tags = TagList::parse("vip");
        assert!(tags.add("subscription due today"));
        assert!(!tags.add("subscription due today"));
        assert_eq!(tags.to_string(), "vip, subscription due today");
    }

    #[test]
    fn test_remove_ignore_case_removes_all_matches() {
        let mut tags = TagList::parse("Subscription due today, vip, subscription DUE today");
        assert_eq!(tags.remove_ignore_case("subscription due today"), 2);
        assert_eq!(tags.to_string(), "vip");
    }

    #[test]
    fn test_remove_missing_tag() {
        let mut tags = TagList::parse("vip");
        assert_eq!(tags.remove_ignore_case("daily subscription"), 0);
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn test_display_empty() {
        assert_eq!(TagList::default().to_string(), "");
    }

    #[test]
    fn test_from_vec_normalizes() {
        let tags = TagList::from(vec![" a ".to_string(), String::new(), "b".to_string()]);
        assert_eq!(tags.iter().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
