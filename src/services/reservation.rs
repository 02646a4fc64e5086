use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::models::{
    Actor, AdminNewReservation, NewReservation, PaymentReference, Reservation, ReservationPatch,
    ReservationStatus, Tour,
};
use crate::repositories::{InsertReservation, ReservationRepository, TourRepository};
use crate::services::validation::validate_new_reservation;
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy)]
pub enum ReservationFilter {
    All,
    ByUser(Uuid),
}

#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 100,
        }
    }
}

/// Who may read a reservation: administrators see everything, owners only
/// their own rows.
#[derive(Debug, Clone, Copy)]
pub enum Access {
    Admin,
    Owner(Uuid),
}

/// Orchestrates the reservation lifecycle: admission, partial updates,
/// cancellation and payment settlement. Cancellation is a status transition;
/// rows are never deleted.
pub struct ReservationService {
    reservations: Arc<dyn ReservationRepository>,
    tours: Arc<dyn TourRepository>,
}

impl ReservationService {
    pub fn new(reservations: Arc<dyn ReservationRepository>, tours: Arc<dyn TourRepository>) -> Self {
        Self {
            reservations,
            tours,
        }
    }

    async fn tour_or_not_found(&self, tour_id: i64) -> Result<Tour, AppError> {
        self.tours
            .find_by_id(tour_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tour {tour_id}")))
    }

    async fn reservation_or_not_found(&self, id: i64) -> Result<Reservation, AppError> {
        self.reservations
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation {id}")))
    }

    fn stamp(reservation: &mut Reservation, actor: Option<Uuid>) {
        let now = Utc::now();
        reservation.updated_at = Some(now);
        reservation.modified_at = Some(now);
        reservation.updated_by = actor;
    }

    /// Self-service creation. Customer name and email default to the actor's
    /// when absent; the actor is both beneficiary and creator.
    pub async fn create(
        &self,
        input: NewReservation,
        actor: &Actor,
    ) -> Result<Reservation, AppError> {
        let tour = self.tour_or_not_found(input.tour_id).await?;
        validate_new_reservation(&tour, input.party_size, input.requested_date)?;

        let customer_name = input
            .customer_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| actor.name.trim().to_string());
        let customer_email = input
            .customer_email
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| actor.email.clone());

        self.reservations
            .insert(InsertReservation {
                tour_id: input.tour_id,
                user_id: Some(actor.id),
                status: ReservationStatus::Pending,
                customer_name,
                customer_email,
                party_size: input.party_size,
                requested_date: input.requested_date,
                created_by: Some(actor.id),
                payment_intent_id: None,
                checkout_session_id: None,
            })
            .await
    }

    /// Admin creation on behalf of an arbitrary user, with an explicit
    /// initial status. The actor is recorded only as creator.
    pub async fn create_as_admin(
        &self,
        input: AdminNewReservation,
        actor: &Actor,
    ) -> Result<Reservation, AppError> {
        let tour = self.tour_or_not_found(input.tour_id).await?;
        validate_new_reservation(&tour, input.party_size, input.requested_date)?;

        self.reservations
            .insert(InsertReservation {
                tour_id: input.tour_id,
                user_id: input.target_user_id,
                status: input.status,
                customer_name: input.customer_name,
                customer_email: input.customer_email,
                party_size: input.party_size,
                requested_date: input.requested_date,
                created_by: Some(actor.id),
                payment_intent_id: None,
                checkout_session_id: None,
            })
            .await
    }

    /// Partial update. Only fields present in the patch are applied; audit
    /// fields are stamped on every call regardless of what changed.
    pub async fn update(
        &self,
        id: i64,
        patch: ReservationPatch,
        actor: &Actor,
    ) -> Result<Reservation, AppError> {
        let mut reservation = self.reservation_or_not_found(id).await?;

        if let Some(tour_id) = patch.tour_id {
            reservation.tour_id = tour_id;
        }
        if let Some(requested_date) = patch.requested_date {
            reservation.requested_date = requested_date;
        }
        if let Some(party_size) = patch.party_size {
            reservation.party_size = party_size;
        }
        if let Some(customer_name) = patch.customer_name {
            reservation.customer_name = customer_name;
        }
        if let Some(customer_email) = patch.customer_email {
            reservation.customer_email = customer_email;
        }
        if let Some(status) = patch.status {
            reservation.status = status;
        }
        Self::stamp(&mut reservation, Some(actor.id));

        self.reservations.update(&reservation).await
    }

    /// Cancellation is the only "delete" exposed for existing reservations.
    /// Allowed from any state, PAID included; the row is kept.
    pub async fn cancel(&self, id: i64, actor: &Actor) -> Result<Reservation, AppError> {
        let mut reservation = self.reservation_or_not_found(id).await?;
        reservation.status = ReservationStatus::Cancelled;
        Self::stamp(&mut reservation, Some(actor.id));
        self.reservations.update(&reservation).await
    }

    /// Settles a reservation as paid and attaches provider correlation ids.
    ///
    /// Idempotent on an already-PAID row: the audit fields are restamped and
    /// no error is raised. A CANCELLED row cannot be resurrected; callers on
    /// the webhook path treat that as a logged skip.
    pub async fn mark_paid(
        &self,
        id: i64,
        reference: PaymentReference,
        actor: Option<Uuid>,
    ) -> Result<Reservation, AppError> {
        let mut reservation = self.reservation_or_not_found(id).await?;

        if reservation.status == ReservationStatus::Cancelled {
            return Err(AppError::InvalidTransition(format!(
                "Reservation {id} is cancelled and cannot be marked paid"
            )));
        }

        reservation.status = ReservationStatus::Paid;
        attach_reference(&mut reservation, reference);
        Self::stamp(&mut reservation, actor);

        let updated = self.reservations.update(&reservation).await?;
        info!(reservation_id = id, "Reservation marked paid");
        Ok(updated)
    }

    /// Stores provider ids after an outbound checkout/intent is created.
    /// Already-set ids win; provider ids are write-once.
    pub async fn attach_payment_reference(
        &self,
        id: i64,
        reference: PaymentReference,
    ) -> Result<Reservation, AppError> {
        let mut reservation = self.reservation_or_not_found(id).await?;
        attach_reference(&mut reservation, reference);
        self.reservations.update(&reservation).await
    }

    pub async fn list(
        &self,
        filter: ReservationFilter,
        page: Page,
    ) -> Result<Vec<Reservation>, AppError> {
        match filter {
            ReservationFilter::All => self.reservations.list_all(page.offset, page.limit).await,
            ReservationFilter::ByUser(user_id) => {
                self.reservations
                    .list_by_user(user_id, page.offset, page.limit)
                    .await
            }
        }
    }

    pub async fn get(&self, id: i64, access: Access) -> Result<Reservation, AppError> {
        let reservation = self.reservation_or_not_found(id).await?;
        if let Access::Owner(user_id) = access {
            if reservation.user_id != Some(user_id) {
                return Err(AppError::Forbidden(
                    "Reservation belongs to another user".to_string(),
                ));
            }
        }
        Ok(reservation)
    }

    /// Total price for a party on a tour, in integer minor units.
    pub async fn price_quote(&self, tour_id: i64, party_size: i32) -> Result<i64, AppError> {
        let tour = self.tour_or_not_found(tour_id).await?;
        Ok(tour.price_cents * i64::from(party_size))
    }

    pub async fn tour(&self, tour_id: i64) -> Result<Tour, AppError> {
        self.tour_or_not_found(tour_id).await
    }
}

fn attach_reference(reservation: &mut Reservation, reference: PaymentReference) {
    if reservation.payment_intent_id.is_none() {
        reservation.payment_intent_id = reference.payment_intent_id;
    }
    if reservation.checkout_session_id.is_none() {
        reservation.checkout_session_id = reference.checkout_session_id;
    }
}
