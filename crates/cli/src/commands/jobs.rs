//! One-off runs of the scheduled jobs.
//!
//! # Environment Variables
//!
//! Same as the worker: `SHOPIFY_STORE`, `SHOPIFY_ACCESS_TOKEN` and the
//! optional `MAILGUARD_*` settings.

use std::sync::Arc;

use chrono::NaiveDate;
use mailguard::config::MailguardConfig;
use mailguard::directory::CustomerDirectory;
use mailguard::services::{RestoreOutcome, SuppressOutcome};
use mailguard::shopify::AdminClient;
use mailguard::state::AppState;

use super::CliError;

async fn load_state() -> Result<AppState, CliError> {
    let config = MailguardConfig::from_env()?;
    let client = AdminClient::new(&config.shopify)?;
    tracing::info!("Connected to {}", client.store());

    let directory: Arc<dyn CustomerDirectory> = Arc::new(client);
    Ok(AppState::new(config, directory).await?)
}

/// Run a suppress pass.
pub async fn suppress() -> Result<(), CliError> {
    let state = load_state().await?;

    match state.coordinator().suppress().await? {
        SuppressOutcome::Completed(report) => tracing::info!(
            "Suppressed {} of {} tagged customers ({} skipped, {} failed, {} pending)",
            report.suppressed,
            report.candidates,
            report.skipped,
            report.failed,
            report.pending
        ),
        SuppressOutcome::AlreadyRunning => tracing::warn!("A suppression run is already active"),
    }
    Ok(())
}

/// Run a restore pass.
pub async fn restore() -> Result<(), CliError> {
    let state = load_state().await?;

    match state.coordinator().restore().await? {
        RestoreOutcome::Completed(report) => tracing::info!(
            "Restored {} customers ({} failed) in {:.1}s",
            report.restored,
            report.failed,
            report.elapsed.as_secs_f64()
        ),
        RestoreOutcome::NothingToRestore => tracing::info!("Nothing to restore"),
    }
    Ok(())
}

/// Run a tag-due pass for `date` (default: today).
pub async fn tag_due(date: Option<NaiveDate>) -> Result<(), CliError> {
    let state = load_state().await?;
    let today = date.unwrap_or_else(|| state.tagger().today());

    let report = state.tagger().tag_due_on(today).await;
    tracing::info!(
        "{today}: {} due, {} tagged, {} already tagged, {} failed",
        report.due,
        report.tagged,
        report.already_tagged,
        report.failed
    );
    Ok(())
}

/// Run an untag-expired pass treating `date` (default: today) as today.
pub async fn untag_expired(date: Option<NaiveDate>) -> Result<(), CliError> {
    let state = load_state().await?;
    let today = date.unwrap_or_else(|| state.tagger().today());

    let report = state.tagger().untag_expired_on(today).await;
    tracing::info!(
        "{today}: {} tagged, {} kept, {} untagged, {} failed",
        report.candidates,
        report.kept,
        report.untagged,
        report.failed
    );
    Ok(())
}
