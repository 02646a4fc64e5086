use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::models::{Actor, NewReservation, PaymentReference};
use crate::services::payments::CheckoutSessionRequest;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::created;

#[derive(Serialize)]
struct PaymentIntentPayload {
    reservation_id: i64,
    payment_intent_id: String,
    client_secret: Option<String>,
}

/// Creates the reservation synchronously, then a provider payment intent
/// for the party's total. The intent id is stored on the row so the
/// `payment_intent.succeeded` webhook can find it later.
pub async fn create_payment_intent(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<NewReservation>,
) -> Result<Response, AppError> {
    let amount = state
        .reservations
        .price_quote(input.tour_id, input.party_size)
        .await?;
    let reservation = state.reservations.create(input, &actor).await?;

    let intent = state
        .gateway
        .create_payment_intent(amount, reservation.id)
        .await?;
    state
        .reservations
        .attach_payment_reference(reservation.id, PaymentReference::payment_intent(&intent.id))
        .await?;

    let payload = PaymentIntentPayload {
        reservation_id: reservation.id,
        payment_intent_id: intent.id,
        client_secret: intent.client_secret,
    };
    Ok(created(payload, "Payment intent created").into_response())
}

#[derive(Serialize)]
struct CheckoutSessionPayload {
    reservation_id: i64,
    session_id: String,
    url: Option<String>,
}

/// Creates the reservation, then a hosted checkout session pointing back at
/// the frontend. The reservation id rides in the session metadata for the
/// `checkout.session.completed` webhook.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<NewReservation>,
) -> Result<Response, AppError> {
    let tour = state.reservations.tour(input.tour_id).await?;
    let amount = tour.price_cents * i64::from(input.party_size);
    let reservation = state.reservations.create(input, &actor).await?;

    let frontend = &state.config.frontend_url;
    let session = state
        .gateway
        .create_checkout_session(CheckoutSessionRequest {
            product_name: tour.name,
            amount_cents: amount,
            reservation_id: reservation.id,
            success_url: format!("{frontend}/checkout?success=true"),
            cancel_url: format!("{frontend}/home"),
        })
        .await?;
    state
        .reservations
        .attach_payment_reference(
            reservation.id,
            PaymentReference::checkout_session(&session.id),
        )
        .await?;

    let payload = CheckoutSessionPayload {
        reservation_id: reservation.id,
        session_id: session.id,
        url: session.url,
    };
    Ok(created(payload, "Checkout session created").into_response())
}
