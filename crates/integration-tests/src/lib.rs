//! Integration tests for Mailguard.
//!
//! Tests drive the public library against an [`InMemoryDirectory`] and a
//! temporary state directory; no Shopify store is needed.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p mailguard-integration-tests
//! ```

use std::sync::Arc;

use axum::Router;
use mailguard::config::{MailguardConfig, ShopifyConfig};
use mailguard::directory::{CustomerDirectory, InMemoryDirectory};
use mailguard::routes;
use mailguard::state::AppState;
use secrecy::SecretString;
use tempfile::TempDir;

/// A worker wired to an in-memory Shopify.
pub struct TestContext {
    pub directory: Arc<InMemoryDirectory>,
    pub state: AppState,
    /// Kept alive for the duration of the test.
    pub state_dir: TempDir,
}

impl TestContext {
    /// Context over `directory` with a fresh state directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory or the state cannot be created.
    pub async fn new(directory: InMemoryDirectory) -> Self {
        let state_dir = tempfile::tempdir().expect("Failed to create state dir");
        Self::in_dir(directory, state_dir).await
    }

    /// Context over `directory` reusing an existing state directory.
    ///
    /// # Panics
    ///
    /// Panics if the state cannot be loaded.
    pub async fn in_dir(directory: InMemoryDirectory, state_dir: TempDir) -> Self {
        let directory = Arc::new(directory);
        let config = MailguardConfig::new(test_shopify_config(), state_dir.path());
        let state = AppState::new(
            config,
            Arc::clone(&directory) as Arc<dyn CustomerDirectory>,
        )
        .await
        .expect("Failed to create application state");

        Self {
            directory,
            state,
            state_dir,
        }
    }

    /// The HTTP application.
    #[must_use]
    pub fn app(&self) -> Router {
        routes::app(self.state.clone())
    }
}

/// Shopify settings that are never used to make a request.
#[must_use]
pub fn test_shopify_config() -> ShopifyConfig {
    ShopifyConfig {
        store: "test.myshopify.com".to_string(),
        api_version: "2025-07".to_string(),
        access_token: SecretString::from("shpat_test"),
    }
}
