//! Local state summary. Needs no Shopify credentials.

use std::path::Path;

use mailguard::store::{BillingStore, SuppressionStore};

use super::CliError;

/// What is on disk in the state directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSummary {
    /// `None` when no suppression is pending.
    pub pending_suppressions: Option<usize>,
    pub billing_entries: usize,
}

/// Log and return a summary of the state files in `state_dir`.
///
/// # Errors
///
/// Returns `CliError::Store` if a state file is unreadable.
pub async fn show(state_dir: &Path) -> Result<StateSummary, CliError> {
    let suppression = SuppressionStore::new(state_dir);
    let pending = suppression.load().await?;
    let billing = BillingStore::open(state_dir).await?;

    let summary = StateSummary {
        pending_suppressions: pending.as_ref().map(Vec::len),
        billing_entries: billing.len().await,
    };

    match &pending {
        Some(records) => {
            tracing::warn!("{} customers suppressed, awaiting restore", records.len());
            for record in records {
                tracing::info!("  {} -> {}", record.id, record.original_email);
            }
        }
        None => tracing::info!("No pending suppression"),
    }
    tracing::info!(
        "{} billing entries in {}",
        summary.billing_entries,
        billing.path().display()
    );

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mailguard_core::{CustomerId, SuppressionRecord};

    use super::*;

    #[tokio::test]
    async fn test_show_empty_dir() {
        let dir = tempfile::tempdir().unwrap();

        let summary = show(dir.path()).await.unwrap();

        assert_eq!(
            summary,
            StateSummary {
                pending_suppressions: None,
                billing_entries: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_show_pending() {
        let dir = tempfile::tempdir().unwrap();
        SuppressionStore::new(dir.path())
            .save(&[SuppressionRecord {
                id: CustomerId::new(1),
                original_email: "a@x.com".to_string(),
            }])
            .await
            .unwrap();

        let summary = show(dir.path()).await.unwrap();

        assert_eq!(summary.pending_suppressions, Some(1));
    }
}
