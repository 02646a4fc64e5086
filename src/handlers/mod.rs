use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::models::Actor;
use crate::utils::error::AppError;
use crate::utils::response::success;

pub mod payments;
pub mod reservations;
pub mod webhook;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    let payload = HealthPayload {
        status: "ok",
        service: "zarpe-api",
    };

    success(payload, "Health check successful").into_response()
}

pub(crate) fn require_admin(actor: &Actor) -> Result<(), AppError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Administrator role required".to_string(),
        ))
    }
}
