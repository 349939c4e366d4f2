//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. Order and staff handlers return
//! `Result<T, AppError>`; the redemption endpoint has its own JSON contract
//! and does not go through here.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::LedgerError;

/// Application-level error type for the canteen.
#[derive(Debug, Error)]
pub enum AppError {
    /// Ledger operation failed.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Ledger(
                LedgerError::Repository(_) | LedgerError::Ticket(_) | LedgerError::Money(_)
            )
        )
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Ledger(err) => match err {
                LedgerError::EmptyCart | LedgerError::Validation(_) => StatusCode::BAD_REQUEST,
                LedgerError::NotFound => StatusCode::NOT_FOUND,
                LedgerError::Forbidden => StatusCode::FORBIDDEN,
                LedgerError::InvalidTransition(_)
                | LedgerError::ConcurrentUpdate
                | LedgerError::CartChanged => StatusCode::CONFLICT,
                LedgerError::Ticket(_) | LedgerError::Money(_) | LedgerError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    // Don't expose internal error details to clients
    fn public_message(&self) -> String {
        if self.is_server_error() {
            return "Internal server error".to_string();
        }
        match self {
            Self::Ledger(err) => match err {
                LedgerError::EmptyCart => "Your cart is empty!".to_string(),
                LedgerError::NotFound => "Order not found".to_string(),
                LedgerError::Forbidden => "Staff access required".to_string(),
                LedgerError::ConcurrentUpdate => {
                    "Order was modified, please reload and retry".to_string()
                }
                LedgerError::CartChanged => {
                    "Your cart changed during checkout, please review it and retry".to_string()
                }
                other => other.to_string(),
            },
            Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let body = json!({ "error": self.public_message() });
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Called by the auth extractors so errors are associated with users.
pub fn set_sentry_user(user_id: &impl ToString, username: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(username.to_string()),
            ..Default::default()
        }));
    });
}
