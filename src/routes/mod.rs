use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, security_headers};
use crate::handlers::{health_check, payments, reservations, webhook};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    let admin = Router::new()
        .route(
            "/reservations",
            post(reservations::admin_create_reservation).get(reservations::admin_list_reservations),
        )
        .route(
            "/reservations/user/:user_id",
            get(reservations::admin_list_reservations_by_user),
        )
        .route(
            "/reservations/:id",
            get(reservations::admin_get_reservation)
                .patch(reservations::admin_update_reservation)
                .delete(reservations::admin_cancel_reservation),
        )
        .route(
            "/reservations/:id/pay",
            post(reservations::admin_mark_reservation_paid),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/reservations", post(reservations::create_reservation))
        .route(
            "/reservations/mine",
            get(reservations::list_my_reservations),
        )
        .route("/reservations/:id", get(reservations::get_reservation))
        .route("/payments/intent", post(payments::create_payment_intent))
        .route(
            "/payments/checkout-session",
            post(payments::create_checkout_session),
        )
        .route("/webhooks/stripe", post(webhook::stripe_webhook))
        .nest("/admin", admin)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(security_headers))
        .layer(create_cors_layer())
        .with_state(state)
}
