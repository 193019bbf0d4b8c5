//! Liveness, readiness and status endpoints.

use axum::{Json, extract::State, http::StatusCode};
use chrono::NaiveDate;
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// # Errors
///
/// Returns `AppError::Unavailable` (503) unless the state directory exists
/// and is writable.
pub async fn readiness(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let meta = tokio::fs::metadata(&state.config().state_dir)
        .await
        .map_err(|e| AppError::Unavailable(format!("state directory: {e}")))?;

    if !meta.is_dir() || meta.permissions().readonly() {
        return Err(AppError::Unavailable(
            "state directory is not writable".to_string(),
        ));
    }
    Ok(StatusCode::OK)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// A suppress or restore pass holds the run flag.
    pub run_active: bool,
    /// A suppression set is waiting to be restored.
    pub suppression_pending: bool,
    pub pending_suppressions: usize,
    pub billing_entries: usize,
    pub timezone: String,
    pub today: NaiveDate,
}

/// `GET /status`
///
/// # Errors
///
/// Returns `AppError::Store` if the pending suppression set is unreadable.
pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let pending = state.coordinator().store().load().await?;

    Ok(Json(StatusResponse {
        run_active: state.coordinator().is_running(),
        suppression_pending: pending.is_some(),
        pending_suppressions: pending.as_ref().map_or(0, Vec::len),
        billing_entries: state.billing().len().await,
        timezone: state.config().schedule.timezone.name().to_string(),
        today: state.tagger().today(),
    }))
}
