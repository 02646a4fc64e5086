use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{info, warn};

use crate::services::{ReconcileOutcome, StripeEvent};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Serialize)]
struct WebhookAck {
    received: bool,
}

fn ack() -> Response {
    success(WebhookAck { received: true }, "Webhook processed").into_response()
}

/// Inbound provider event feed.
///
/// Only a failed signature check is allowed to produce an error response.
/// Everything after that is acknowledged with success: the provider
/// redelivers on anything else, and business-logic skips must not turn
/// into retry storms.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    state.verifier.verify(&body, signature)?;

    let event: StripeEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Signed webhook body was not a parsable event; acknowledging");
            return Ok(ack());
        }
    };

    let outcome = state.reconciler.process(&event).await;
    match outcome {
        ReconcileOutcome::Paid { reservation_id } => {
            info!(reservation_id, event_id = %event.id, "Reservation settled by webhook");
        }
        ReconcileOutcome::Created { reservation_id } => {
            info!(reservation_id, event_id = %event.id, "Reservation created by webhook");
        }
        ReconcileOutcome::Skipped | ReconcileOutcome::Ignored => {}
    }

    Ok(ack())
}
