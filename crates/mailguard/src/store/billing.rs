//! Billing map (`billing_dates.json`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use mailguard_core::{BillingEntry, CustomerId};
use tokio::sync::RwLock;

use super::{BILLING_FILE, StoreError, read_optional, write_atomic};

/// Next billing date per customer, kept in memory and mirrored to disk.
///
/// Entries are only ever inserted or replaced.
#[derive(Debug)]
pub struct BillingStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<CustomerId, BillingEntry>>,
}

impl BillingStore {
    /// Open `<state_dir>/billing_dates.json`, starting empty if it is absent.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file exists but cannot be read or parsed.
    pub async fn open(state_dir: &Path) -> Result<Self, StoreError> {
        let path = state_dir.join(BILLING_FILE);
        let entries = match read_optional(&path).await? {
            Some(bytes) => {
                serde_json::from_slice(&bytes).map_err(|e| StoreError::json(&path, e))?
            }
            None => BTreeMap::new(),
        };

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace the entry for `id` and persist the whole map.
    ///
    /// The in-memory map only changes once the write has succeeded.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the map cannot be written.
    pub async fn upsert(&self, id: CustomerId, entry: BillingEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;

        let mut next = entries.clone();
        next.insert(id, entry);

        let bytes =
            serde_json::to_vec_pretty(&next).map_err(|e| StoreError::json(&self.path, e))?;
        write_atomic(&self.path, &bytes).await?;

        *entries = next;
        Ok(())
    }

    pub async fn get(&self, id: CustomerId) -> Option<BillingEntry> {
        self.entries.read().await.get(&id).cloned()
    }

    /// Copy of the whole map.
    pub async fn snapshot(&self) -> BTreeMap<CustomerId, BillingEntry> {
        self.entries.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn entry(date: &str, email: &str) -> BillingEntry {
        BillingEntry {
            next_billing_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = BillingStore::open(dir.path()).await.unwrap();
        assert!(store.is_empty().await);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_upsert_persists_keyed_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = BillingStore::open(dir.path()).await.unwrap();

        store
            .upsert(CustomerId::new(1_234_567_890), entry("2025-06-30", "a@x.com"))
            .await
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(
            raw,
            serde_json::json!({
                "1234567890": {"nextBillingDate": "2025-06-30", "email": "a@x.com"}
            })
        );
    }

    #[tokio::test]
    async fn test_last_write_wins_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = BillingStore::open(dir.path()).await.unwrap();
        let id = CustomerId::new(7);

        store.upsert(id, entry("2025-06-30", "a@x.com")).await.unwrap();
        store.upsert(id, entry("2025-07-30", "new@x.com")).await.unwrap();
        store
            .upsert(CustomerId::new(8), entry("2025-07-01", "b@x.com"))
            .await
            .unwrap();

        let reopened = BillingStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.len().await, 2);
        assert_eq!(
            reopened.get(id).await.unwrap(),
            entry("2025-07-30", "new@x.com")
        );
    }

    #[tokio::test]
    async fn test_failed_write_leaves_map_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes the rename fail.
        std::fs::create_dir(dir.path().join(BILLING_FILE)).unwrap();
        std::fs::write(dir.path().join(BILLING_FILE).join("keep"), "x").unwrap();

        let store = BillingStore {
            path: dir.path().join(BILLING_FILE),
            entries: RwLock::new(BTreeMap::new()),
        };

        let result = store
            .upsert(CustomerId::new(1), entry("2025-06-30", "a@x.com"))
            .await;
        assert!(matches!(result, Err(StoreError::Io { .. })));
        assert!(store.is_empty().await);
    }
}
