//! Application state shared across handlers and scheduled jobs.

use std::sync::Arc;

use crate::config::MailguardConfig;
use crate::directory::CustomerDirectory;
use crate::services::{BillingTagger, SuppressionCoordinator};
use crate::store::{BillingStore, StoreError, SuppressionStore};

/// Application state shared across all handlers and jobs.
///
/// Cheaply cloneable via `Arc`. The run flag and both stores live here
/// rather than in globals.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: MailguardConfig,
    billing: Arc<BillingStore>,
    coordinator: SuppressionCoordinator,
    tagger: BillingTagger,
}

impl AppState {
    /// Create the application state, loading the billing map from disk.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if `billing_dates.json` exists but is unreadable.
    pub async fn new(
        config: MailguardConfig,
        directory: Arc<dyn CustomerDirectory>,
    ) -> Result<Self, StoreError> {
        let billing = Arc::new(BillingStore::open(&config.state_dir).await?);

        let coordinator = SuppressionCoordinator::new(
            Arc::clone(&directory),
            SuppressionStore::new(&config.state_dir),
            config.tags.suppression.clone(),
            config.pacing,
        );
        let tagger = BillingTagger::new(
            directory,
            Arc::clone(&billing),
            config.tags.due.clone(),
            config.schedule.timezone,
            config.pacing,
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                billing,
                coordinator,
                tagger,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &MailguardConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn billing(&self) -> &BillingStore {
        &self.inner.billing
    }

    #[must_use]
    pub fn coordinator(&self) -> &SuppressionCoordinator {
        &self.inner.coordinator
    }

    #[must_use]
    pub fn tagger(&self) -> &BillingTagger {
        &self.inner.tagger
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("state_dir", &self.inner.config.state_dir)
            .field("coordinator", &self.inner.coordinator)
            .finish_non_exhaustive()
    }
}
