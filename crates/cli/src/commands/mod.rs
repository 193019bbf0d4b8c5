//! Command implementations.

pub mod jobs;
pub mod status;

use mailguard::config::ConfigError;
use mailguard::services::SuppressionError;
use mailguard::shopify::ShopifyError;
use mailguard::store::StoreError;
use thiserror::Error;

/// Errors that stop a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    #[error("State error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Suppression(#[from] SuppressionError),
}
