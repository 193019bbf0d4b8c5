//! JSON documents in the state directory.
//!
//! Both stores write the whole document on every save, through a sibling
//! `.tmp` file that is renamed over the target, so readers only ever see a
//! complete document.

mod billing;
mod suppression;

pub use billing::BillingStore;
pub use suppression::SuppressionStore;

use std::path::{Path, PathBuf};

use thiserror::Error;

/// File name of the pending suppression set.
pub const SUPPRESSION_FILE: &str = "suppressed_customers.json";
/// File name of the billing map.
pub const BILLING_FILE: &str = "billing_dates.json";

/// Errors reading or writing a state file.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed state file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Write `bytes` to `path` via `<path>.tmp` and a rename.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| StoreError::io(path, e))
}

/// Read a state file, `None` when it does not exist.
async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_atomic_creates_parent_and_leaves_no_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        write_atomic(&path, b"[]").await.unwrap();

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"[]");
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_read_optional_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_optional(&dir.path().join("absent.json")).await.unwrap();
        assert!(result.is_none());
    }
}
