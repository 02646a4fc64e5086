use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::models::{DirectoryUser, PaymentReference, ReservationStatus};
use crate::repositories::{InsertReservation, ReservationRepository, UserDirectory};
use crate::services::reservation::ReservationService;

/// Placeholder customer name when the provider's customer profile carries
/// none.
const FALLBACK_CUSTOMER_NAME: &str = "Cliente";

/// Signed provider event envelope, already signature-verified by the HTTP
/// layer. `data.object` stays untyped; metadata shapes vary per flow and
/// extraction must stay tolerant.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: Value,
}

/// What a delivery amounted to. Every variant is acknowledged with success
/// to the provider; the distinction is for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// An existing reservation was driven to PAID.
    Paid { reservation_id: i64 },
    /// A reservation was created from event metadata and driven to PAID.
    Created { reservation_id: i64 },
    /// A handled event type that resulted in no mutation (logged).
    Skipped,
    /// An event type this reconciler does not handle.
    Ignored,
}

/// Consumes provider payment events and drives reservation transitions.
///
/// Deliveries are at-least-once and may arrive out of order, so every path
/// is idempotent or harmless on repeat, and business-logic failures are
/// logged and acknowledged rather than surfaced: a retry storm helps nobody.
pub struct PaymentWebhookReconciler {
    service: Arc<ReservationService>,
    reservations: Arc<dyn ReservationRepository>,
    users: Arc<dyn UserDirectory>,
}

impl PaymentWebhookReconciler {
    pub fn new(
        service: Arc<ReservationService>,
        reservations: Arc<dyn ReservationRepository>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            service,
            reservations,
            users,
        }
    }

    pub async fn process(&self, event: &StripeEvent) -> ReconcileOutcome {
        info!(event_id = %event.id, event_type = %event.kind, "Processing provider event");
        match event.kind.as_str() {
            "checkout.session.completed" => self.checkout_session_completed(event).await,
            "payment_intent.succeeded" => self.payment_intent_succeeded(event).await,
            other => {
                debug!(event_type = other, "Ignoring unhandled event type");
                ReconcileOutcome::Ignored
            }
        }
    }

    async fn checkout_session_completed(&self, event: &StripeEvent) -> ReconcileOutcome {
        let object = &event.data.object;
        let session_id = object.get("id").and_then(Value::as_str);

        // Pre-created flow: metadata names the reservation directly.
        if let Some(reservation_id) = object
            .pointer("/metadata/reserva_id")
            .and_then(flexible_i64)
        {
            return self.settle_precreated(reservation_id, session_id).await;
        }

        // Deferred flow: the reservation itself travels in the metadata.
        let raw_payload = object
            .pointer("/metadata/reserva_payload")
            .or_else(|| object.pointer("/metadata/payload"));
        let Some(raw_payload) = raw_payload else {
            error!(
                session = session_id.unwrap_or_default(),
                "checkout.session.completed carries no reservation metadata; skipping"
            );
            return ReconcileOutcome::Skipped;
        };

        self.create_from_metadata(object, raw_payload, session_id)
            .await
    }

    async fn settle_precreated(
        &self,
        reservation_id: i64,
        session_id: Option<&str>,
    ) -> ReconcileOutcome {
        match self.reservations.find_by_id(reservation_id).await {
            Ok(Some(_)) => {
                let reference = session_id
                    .map(PaymentReference::checkout_session)
                    .unwrap_or_default();
                match self.service.mark_paid(reservation_id, reference, None).await {
                    Ok(_) => ReconcileOutcome::Paid { reservation_id },
                    Err(e) => {
                        warn!(reservation_id, error = %e, "Could not settle reservation");
                        ReconcileOutcome::Skipped
                    }
                }
            }
            Ok(None) => {
                info!(
                    reservation_id,
                    "Checkout completed for a reservation unknown locally; acknowledging"
                );
                ReconcileOutcome::Skipped
            }
            Err(e) => {
                error!(reservation_id, error = %e, "Reservation lookup failed");
                ReconcileOutcome::Skipped
            }
        }
    }

    async fn create_from_metadata(
        &self,
        object: &Value,
        raw_payload: &Value,
        session_id: Option<&str>,
    ) -> ReconcileOutcome {
        // Redelivery guard: a reservation already carrying this checkout
        // session id was created by an earlier delivery of the same event.
        // Settlement may have failed after the insert, so an unpaid row is
        // driven to PAID here rather than skipped.
        if let Some(session) = session_id {
            match self.reservations.find_by_checkout_session(session).await {
                Ok(Some(existing)) => {
                    if existing.status == ReservationStatus::Paid {
                        info!(
                            reservation_id = existing.id,
                            session, "Redelivered checkout session; reservation already settled"
                        );
                        return ReconcileOutcome::Skipped;
                    }
                    info!(
                        reservation_id = existing.id,
                        session, "Redelivered checkout session; settling existing reservation"
                    );
                    return match self
                        .service
                        .mark_paid(existing.id, PaymentReference::default(), None)
                        .await
                    {
                        Ok(_) => ReconcileOutcome::Paid {
                            reservation_id: existing.id,
                        },
                        Err(e) => {
                            warn!(reservation_id = existing.id, error = %e, "Could not settle reservation");
                            ReconcileOutcome::Skipped
                        }
                    };
                }
                Ok(None) => {}
                Err(e) => {
                    error!(session, error = %e, "Deduplication lookup failed");
                    return ReconcileOutcome::Skipped;
                }
            }
        }

        // Metadata values arrive either as a JSON-encoded string or as an
        // already-structured object.
        let payload: Value = match raw_payload {
            Value::String(s) => match serde_json::from_str(s) {
                Ok(v) => v,
                Err(e) => {
                    error!(error = %e, "Invalid JSON in reservation payload; skipping");
                    return ReconcileOutcome::Skipped;
                }
            },
            other => other.clone(),
        };

        let tour_id = payload
            .get("tour_id")
            .or_else(|| payload.get("id_tour"))
            .and_then(flexible_i64);
        let Some(tour_id) = tour_id else {
            error!("Reservation payload has no tour id; skipping");
            return ReconcileOutcome::Skipped;
        };

        let requested_date = match payload.get("fecha_reserva").and_then(Value::as_str) {
            Some(s) => match parse_event_date(s) {
                Some(d) => d,
                None => {
                    error!(value = s, "Unparsable reservation date; skipping");
                    return ReconcileOutcome::Skipped;
                }
            },
            None => Utc::now(),
        };

        let party_size = match payload.get("numero_personas") {
            None => 1,
            Some(value) => match flexible_i64(value).and_then(|n| i32::try_from(n).ok()) {
                Some(n) => n,
                None => {
                    error!(value = %value, "Unusable party size in reservation payload; skipping");
                    return ReconcileOutcome::Skipped;
                }
            },
        };

        let payload_email = payload.get("user_email").and_then(Value::as_str);

        // Best-effort account match; a guest reservation is fine.
        let user = match payload_email {
            Some(email) => match self.users.find_by_email(email).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(email, error = %e, "User directory lookup failed");
                    None
                }
            },
            None => None,
        };
        let user_id = user.as_ref().map(|u| u.id);

        // Name preference: the provider's customer profile, then the matched
        // account, then the placeholder.
        let customer_name = object
            .pointer("/customer_details/name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty())
            .or_else(|| {
                user.as_ref()
                    .map(DirectoryUser::full_name)
                    .filter(|n| !n.is_empty())
            })
            .unwrap_or_else(|| FALLBACK_CUSTOMER_NAME.to_string());
        let customer_email = payload_email
            .or_else(|| {
                object
                    .pointer("/customer_details/email")
                    .and_then(Value::as_str)
            })
            .unwrap_or_default()
            .to_string();
        let payment_intent_id = object
            .get("payment_intent")
            .and_then(Value::as_str)
            .map(str::to_string);

        let record = InsertReservation {
            tour_id,
            user_id,
            status: ReservationStatus::Pending,
            customer_name,
            customer_email,
            party_size,
            requested_date,
            created_by: None,
            payment_intent_id,
            checkout_session_id: session_id.map(str::to_string),
        };

        let created = match self.reservations.insert(record).await {
            Ok(r) => r,
            Err(e) => {
                error!(tour_id, error = %e, "Could not persist reservation from metadata");
                return ReconcileOutcome::Skipped;
            }
        };

        match self
            .service
            .mark_paid(created.id, PaymentReference::default(), None)
            .await
        {
            Ok(_) => {
                info!(
                    reservation_id = created.id,
                    tour_id, "Reservation created from checkout metadata"
                );
                ReconcileOutcome::Created {
                    reservation_id: created.id,
                }
            }
            Err(e) => {
                warn!(reservation_id = created.id, error = %e, "Created but could not settle");
                ReconcileOutcome::Created {
                    reservation_id: created.id,
                }
            }
        }
    }

    async fn payment_intent_succeeded(&self, event: &StripeEvent) -> ReconcileOutcome {
        let object = &event.data.object;
        let intent_id = object.get("id").and_then(Value::as_str);

        let mut reservation = None;
        if let Some(reservation_id) = object
            .pointer("/metadata/reserva_id")
            .and_then(flexible_i64)
        {
            reservation = match self.reservations.find_by_id(reservation_id).await {
                Ok(found) => found,
                Err(e) => {
                    error!(reservation_id, error = %e, "Reservation lookup failed");
                    None
                }
            };
        }

        // Fall back to the correlation id stored when the intent was created.
        if reservation.is_none() {
            if let Some(intent) = intent_id {
                reservation = match self.reservations.find_by_payment_intent(intent).await {
                    Ok(found) => found,
                    Err(e) => {
                        error!(intent, error = %e, "Payment-intent lookup failed");
                        None
                    }
                };
            }
        }

        let Some(reservation) = reservation else {
            info!(
                intent = intent_id.unwrap_or_default(),
                "No reservation linked to payment intent; acknowledging"
            );
            return ReconcileOutcome::Skipped;
        };

        let reference = intent_id
            .map(PaymentReference::payment_intent)
            .unwrap_or_default();
        match self.service.mark_paid(reservation.id, reference, None).await {
            Ok(_) => ReconcileOutcome::Paid {
                reservation_id: reservation.id,
            },
            Err(e) => {
                warn!(reservation_id = reservation.id, error = %e, "Could not settle reservation");
                ReconcileOutcome::Skipped
            }
        }
    }
}

fn flexible_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_event_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Actor;
    use crate::services::reservation::ReservationService;
    use crate::services::support::{
        customer, directory_user, tour, InMemoryReservations, InMemoryTours, InMemoryUsers,
    };
    use chrono::Duration;
    use serde_json::json;

    struct Harness {
        reconciler: PaymentWebhookReconciler,
        service: Arc<ReservationService>,
        reservations: Arc<InMemoryReservations>,
        buyer: Actor,
    }

    fn harness(users: InMemoryUsers) -> Harness {
        let reservations = Arc::new(InMemoryReservations::new());
        let tours = Arc::new(
            InMemoryTours::new()
                .with(tour(1, Some(10), Some(true)))
                .with(tour(5, Some(10), Some(true))),
        );
        let service = Arc::new(ReservationService::new(reservations.clone(), tours));
        let reconciler =
            PaymentWebhookReconciler::new(service.clone(), reservations.clone(), Arc::new(users));
        Harness {
            reconciler,
            service,
            reservations,
            buyer: customer("Ana Mora", "ana@example.com"),
        }
    }

    async fn pending_reservation(h: &Harness) -> i64 {
        h.service
            .create(
                crate::models::NewReservation {
                    tour_id: 1,
                    requested_date: Utc::now() + Duration::days(3),
                    party_size: 2,
                    customer_name: None,
                    customer_email: None,
                },
                &h.buyer,
            )
            .await
            .unwrap()
            .id
    }

    fn event(value: serde_json::Value) -> StripeEvent {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn checkout_completed_settles_a_precreated_reservation() {
        let h = harness(InMemoryUsers::new());
        let id = pending_reservation(&h).await;

        let outcome = h
            .reconciler
            .process(&event(json!({
                "id": "evt_1",
                "type": "checkout.session.completed",
                "data": {"object": {
                    "id": "cs_test_1",
                    "metadata": {"reserva_id": id.to_string()}
                }}
            })))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Paid { reservation_id: id });
        let updated = h.reservations.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(updated.status, ReservationStatus::Paid);
        assert_eq!(updated.checkout_session_id.as_deref(), Some("cs_test_1"));
    }

    #[tokio::test]
    async fn checkout_completed_for_unknown_reservation_is_acknowledged() {
        let h = harness(InMemoryUsers::new());

        let outcome = h
            .reconciler
            .process(&event(json!({
                "id": "evt_2",
                "type": "checkout.session.completed",
                "data": {"object": {
                    "id": "cs_test_2",
                    "metadata": {"reserva_id": "9999"}
                }}
            })))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Skipped);
        assert_eq!(h.reservations.row_count(), 0);
    }

    #[tokio::test]
    async fn checkout_completed_creates_a_reservation_from_metadata() {
        let h = harness(InMemoryUsers::new().with(directory_user("a@b.com")));

        let payload =
            r#"{"tour_id":"5","fecha_reserva":"2031-06-01T00:00:00","numero_personas":"2","user_email":"a@b.com"}"#;
        let outcome = h
            .reconciler
            .process(&event(json!({
                "id": "evt_3",
                "type": "checkout.session.completed",
                "data": {"object": {
                    "id": "cs_test_3",
                    "payment_intent": "pi_test_3",
                    "customer_details": {"name": "Ana", "email": "a@b.com"},
                    "metadata": {"reserva_payload": payload}
                }}
            })))
            .await;

        let ReconcileOutcome::Created { reservation_id } = outcome else {
            panic!("expected Created, got {outcome:?}");
        };
        let created = h
            .reservations
            .find_by_id(reservation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.tour_id, 5);
        assert_eq!(created.party_size, 2);
        assert_eq!(created.status, ReservationStatus::Paid);
        assert_eq!(created.customer_email, "a@b.com");
        assert!(created.user_id.is_some());
        assert_eq!(created.checkout_session_id.as_deref(), Some("cs_test_3"));
        assert_eq!(created.payment_intent_id.as_deref(), Some("pi_test_3"));
    }

    #[tokio::test]
    async fn metadata_creation_defaults_name_and_tolerates_unknown_email() {
        let h = harness(InMemoryUsers::new());

        let outcome = h
            .reconciler
            .process(&event(json!({
                "id": "evt_4",
                "type": "checkout.session.completed",
                "data": {"object": {
                    "id": "cs_test_4",
                    "metadata": {"reserva_payload": {
                        "id_tour": 5,
                        "numero_personas": 3,
                        "user_email": "nobody@example.com"
                    }}
                }}
            })))
            .await;

        let ReconcileOutcome::Created { reservation_id } = outcome else {
            panic!("expected Created, got {outcome:?}");
        };
        let created = h
            .reservations
            .find_by_id(reservation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.customer_name, "Cliente");
        assert_eq!(created.user_id, None);
        assert_eq!(created.party_size, 3);
    }

    #[tokio::test]
    async fn metadata_creation_names_customer_after_matched_account() {
        let h = harness(InMemoryUsers::new().with(directory_user("a@b.com")));

        let outcome = h
            .reconciler
            .process(&event(json!({
                "id": "evt_4b",
                "type": "checkout.session.completed",
                "data": {"object": {
                    "id": "cs_test_4b",
                    "metadata": {"reserva_payload": {
                        "tour_id": 5,
                        "user_email": "a@b.com"
                    }}
                }}
            })))
            .await;

        let ReconcileOutcome::Created { reservation_id } = outcome else {
            panic!("expected Created, got {outcome:?}");
        };
        let created = h
            .reservations
            .find_by_id(reservation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.customer_name, "Test User");
        assert!(created.user_id.is_some());
    }

    #[tokio::test]
    async fn redelivered_metadata_event_creates_no_duplicate() {
        let h = harness(InMemoryUsers::new());
        let evt = json!({
            "id": "evt_5",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_test_5",
                "metadata": {"reserva_payload": {"tour_id": 5, "numero_personas": 1}}
            }}
        });

        let first = h.reconciler.process(&event(evt.clone())).await;
        let second = h.reconciler.process(&event(evt)).await;

        assert!(matches!(first, ReconcileOutcome::Created { .. }));
        assert_eq!(second, ReconcileOutcome::Skipped);
        assert_eq!(h.reservations.row_count(), 1);
    }

    #[tokio::test]
    async fn redelivery_settles_a_reservation_left_pending_by_a_failed_settlement() {
        let h = harness(InMemoryUsers::new());
        // A prior delivery inserted the row but settlement never landed.
        let stranded = h
            .reservations
            .insert(InsertReservation {
                tour_id: 5,
                user_id: None,
                status: ReservationStatus::Pending,
                customer_name: "Cliente".to_string(),
                customer_email: String::new(),
                party_size: 1,
                requested_date: Utc::now() + Duration::days(3),
                created_by: None,
                payment_intent_id: None,
                checkout_session_id: Some("cs_test_5b".to_string()),
            })
            .await
            .unwrap();

        let outcome = h
            .reconciler
            .process(&event(json!({
                "id": "evt_5b",
                "type": "checkout.session.completed",
                "data": {"object": {
                    "id": "cs_test_5b",
                    "metadata": {"reserva_payload": {"tour_id": 5, "numero_personas": 1}}
                }}
            })))
            .await;

        assert_eq!(
            outcome,
            ReconcileOutcome::Paid {
                reservation_id: stranded.id
            }
        );
        let settled = h
            .reservations
            .find_by_id(stranded.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(settled.status, ReservationStatus::Paid);
        assert_eq!(h.reservations.row_count(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_and_missing_tour_id_are_acknowledged() {
        let h = harness(InMemoryUsers::new());

        let garbled = h
            .reconciler
            .process(&event(json!({
                "id": "evt_6",
                "type": "checkout.session.completed",
                "data": {"object": {
                    "id": "cs_test_6",
                    "metadata": {"reserva_payload": "{not json"}
                }}
            })))
            .await;
        assert_eq!(garbled, ReconcileOutcome::Skipped);

        let tourless = h
            .reconciler
            .process(&event(json!({
                "id": "evt_7",
                "type": "checkout.session.completed",
                "data": {"object": {
                    "id": "cs_test_7",
                    "metadata": {"reserva_payload": {"numero_personas": 2}}
                }}
            })))
            .await;
        assert_eq!(tourless, ReconcileOutcome::Skipped);
        assert_eq!(h.reservations.row_count(), 0);
    }

    #[tokio::test]
    async fn party_size_outside_i32_range_is_acknowledged_not_truncated() {
        let h = harness(InMemoryUsers::new());

        let outcome = h
            .reconciler
            .process(&event(json!({
                "id": "evt_7b",
                "type": "checkout.session.completed",
                "data": {"object": {
                    "id": "cs_test_7b",
                    "metadata": {"reserva_payload": {
                        "tour_id": 5,
                        "numero_personas": 4_294_967_298_i64
                    }}
                }}
            })))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Skipped);
        assert_eq!(h.reservations.row_count(), 0);
    }

    #[tokio::test]
    async fn payment_intent_resolves_by_metadata_reservation_id() {
        let h = harness(InMemoryUsers::new());
        let id = pending_reservation(&h).await;

        let outcome = h
            .reconciler
            .process(&event(json!({
                "id": "evt_8",
                "type": "payment_intent.succeeded",
                "data": {"object": {
                    "id": "pi_test_8",
                    "metadata": {"reserva_id": id}
                }}
            })))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Paid { reservation_id: id });
        let updated = h.reservations.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(updated.status, ReservationStatus::Paid);
        assert_eq!(updated.payment_intent_id.as_deref(), Some("pi_test_8"));
    }

    #[tokio::test]
    async fn payment_intent_falls_back_to_stored_correlation_id() {
        let h = harness(InMemoryUsers::new());
        let id = pending_reservation(&h).await;
        h.service
            .attach_payment_reference(id, PaymentReference::payment_intent("pi_test_9"))
            .await
            .unwrap();

        let outcome = h
            .reconciler
            .process(&event(json!({
                "id": "evt_9",
                "type": "payment_intent.succeeded",
                "data": {"object": {"id": "pi_test_9", "metadata": {}}}
            })))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Paid { reservation_id: id });
    }

    #[tokio::test]
    async fn payment_intent_with_no_linked_reservation_is_acknowledged() {
        let h = harness(InMemoryUsers::new());

        let outcome = h
            .reconciler
            .process(&event(json!({
                "id": "evt_10",
                "type": "payment_intent.succeeded",
                "data": {"object": {"id": "pi_unlinked"}}
            })))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Skipped);
    }

    #[tokio::test]
    async fn cancelled_reservations_are_not_resurrected_by_the_provider() {
        let h = harness(InMemoryUsers::new());
        let id = pending_reservation(&h).await;
        h.service
            .cancel(id, &crate::services::support::admin())
            .await
            .unwrap();

        let outcome = h
            .reconciler
            .process(&event(json!({
                "id": "evt_11",
                "type": "checkout.session.completed",
                "data": {"object": {
                    "id": "cs_test_11",
                    "metadata": {"reserva_id": id}
                }}
            })))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Skipped);
        let row = h.reservations.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(row.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn unhandled_event_types_are_ignored() {
        let h = harness(InMemoryUsers::new());

        let outcome = h
            .reconciler
            .process(&event(json!({
                "id": "evt_12",
                "type": "charge.refunded",
                "data": {"object": {}}
            })))
            .await;

        assert_eq!(outcome, ReconcileOutcome::Ignored);
    }
}
