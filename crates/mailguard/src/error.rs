//! Errors at the HTTP boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::routes::webhook::WebhookError;
use crate::store::StoreError;

/// Error returned by request handlers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Webhook payload was missing a field or carried an unparseable value.
    #[error("Invalid webhook payload: {0}")]
    Webhook(#[from] WebhookError),

    /// State file could not be read or written.
    #[error("State error: {0}")]
    Store(#[from] StoreError),

    /// The worker cannot serve requests, e.g. its state directory is gone.
    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl AppError {
    /// HTTP status sent to the caller.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Webhook(_) => StatusCode::BAD_REQUEST,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    const fn is_server_fault(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if !self.is_server_fault() {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
            return (status, self.to_string()).into_response();
        }

        let event_id = sentry::capture_error(&self);
        tracing::error!(error = %self, sentry_event_id = %event_id, "Request failed");

        // Store errors carry file paths
        (status, "Internal server error").into_response()
    }
}
