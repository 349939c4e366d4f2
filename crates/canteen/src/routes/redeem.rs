//! Ticket redemption endpoint used by scanners.
//!
//! Always answers with `{ "success": bool, "message": String, ... }`, for
//! business outcomes and failures alike, so a scanner only needs one decoder.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use quickbites_core::Money;

use crate::services::RedemptionOutcome;
use crate::state::AppState;

/// Request body.
#[derive(Debug, Deserialize)]
pub struct RedeemRequest {
    /// Scanned QR text. Missing is treated as empty.
    #[serde(default)]
    pub qr_data: String,
}

/// Response body.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RedeemResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<Money>,
}

impl RedeemResponse {
    fn failure(message: &str) -> Self {
        Self {
            success: false,
            message: message.to_string(),
            customer_name: None,
            total_amount: None,
        }
    }
}

impl From<RedemptionOutcome> for RedeemResponse {
    fn from(outcome: RedemptionOutcome) -> Self {
        match outcome {
            RedemptionOutcome::Redeemed(redeemed) => Self {
                success: true,
                message: format!("Order {} redeemed successfully", redeemed.order_id),
                customer_name: Some(redeemed.customer_name),
                total_amount: Some(redeemed.total_amount),
            },
            RedemptionOutcome::AlreadyRedeemed => Self::failure("Ticket already redeemed"),
            RedemptionOutcome::NotFound => Self::failure("Order not found"),
            RedemptionOutcome::InvalidToken => Self::failure("Invalid QR code"),
            RedemptionOutcome::Cancelled => Self::failure("Order has been cancelled"),
        }
    }
}

/// Redeem a scanned ticket.
///
/// The body is parsed by hand so that malformed JSON still gets the JSON
/// failure shape instead of axum's plain-text rejection.
#[instrument(skip(state, body))]
pub async fn redeem_ticket(State(state): State<AppState>, body: Bytes) -> Response {
    let request: RedeemRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::info!(error = %e, "Malformed redemption request");
            return (
                StatusCode::BAD_REQUEST,
                Json(RedeemResponse::failure("Error processing request")),
            )
                .into_response();
        }
    };

    match state.redemption().redeem(&request.qr_data).await {
        Ok(outcome) => (StatusCode::OK, Json(RedeemResponse::from(outcome))).into_response(),
        Err(e) => {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Redemption failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RedeemResponse::failure("Error processing request")),
            )
                .into_response()
        }
    }
}

/// Any method other than POST.
pub async fn invalid_method() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(RedeemResponse::failure("Invalid request method")),
    )
        .into_response()
}
