//! Pending suppression set (`suppressed_customers.json`).

use std::path::{Path, PathBuf};

use mailguard_core::SuppressionRecord;

use super::{SUPPRESSION_FILE, StoreError, read_optional, write_atomic};

/// Durable list of customers whose email is currently replaced.
///
/// The file exists exactly while a suppression is pending; restore deletes
/// it after draining every record.
#[derive(Debug, Clone)]
pub struct SuppressionStore {
    path: PathBuf,
}

impl SuppressionStore {
    /// Store backed by `<state_dir>/suppressed_customers.json`.
    #[must_use]
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(SUPPRESSION_FILE),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a pending suppression set is on disk.
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Load the pending set.
    ///
    /// Returns `Ok(None)` when no suppression is pending.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Malformed` if the document is not a JSON array,
    /// `StoreError::Json` if an element is not a valid record, and
    /// `StoreError::Io` if the file cannot be read.
    pub async fn load(&self) -> Result<Option<Vec<SuppressionRecord>>, StoreError> {
        let Some(bytes) = read_optional(&self.path).await? else {
            return Ok(None);
        };

        let value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::json(&self.path, e))?;
        if !value.is_array() {
            return Err(StoreError::Malformed {
                path: self.path.clone(),
                reason: "expected a JSON array of records".to_string(),
            });
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::json(&self.path, e))
    }

    /// Replace the pending set.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the document cannot be written.
    pub async fn save(&self, records: &[SuppressionRecord]) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec_pretty(records).map_err(|e| StoreError::json(&self.path, e))?;
        write_atomic(&self.path, &bytes).await
    }

    /// Remove the pending set. Succeeds if it is already gone.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file exists but cannot be removed.
    pub async fn delete(&self) -> Result<(), StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }
}
