use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Settlement state of a reservation.
///
/// `CANCELLED` is a status transition, never a row deletion; a cancelled
/// reservation keeps its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "reservation_status")]
pub enum ReservationStatus {
    #[serde(rename = "PENDING")]
    #[sqlx(rename = "PENDING")]
    Pending,
    #[serde(rename = "PAID")]
    #[sqlx(rename = "PAID")]
    Paid,
    #[serde(rename = "CANCELLED")]
    #[sqlx(rename = "CANCELLED")]
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Reservation {
    pub id: i64,
    pub tour_id: i64,
    /// Beneficiary account. `None` for guest or webhook-originated bookings.
    pub user_id: Option<Uuid>,
    pub status: ReservationStatus,
    /// Customer display fields captured at creation time; not kept in sync
    /// with the live user record.
    pub customer_name: String,
    pub customer_email: String,
    pub party_size: i32,
    pub requested_date: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    /// Provider-assigned correlation ids; at most one of each, set once.
    pub payment_intent_id: Option<String>,
    pub checkout_session_id: Option<String>,
}

/// Public creation request. Name and email fall back to the actor's.
#[derive(Debug, Clone, Deserialize)]
pub struct NewReservation {
    pub tour_id: i64,
    pub requested_date: DateTime<Utc>,
    pub party_size: i32,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
}

/// Admin creation request: targets an arbitrary user and may pick the
/// initial status. Name and email are required here; the target user, not
/// the acting admin, is the beneficiary, so no actor fallback applies.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminNewReservation {
    pub tour_id: i64,
    pub target_user_id: Option<Uuid>,
    pub requested_date: DateTime<Utc>,
    pub party_size: i32,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default = "default_status")]
    pub status: ReservationStatus,
}

fn default_status() -> ReservationStatus {
    ReservationStatus::Pending
}

/// Partial update: only fields present in the request are applied.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReservationPatch {
    pub tour_id: Option<i64>,
    pub requested_date: Option<DateTime<Utc>>,
    pub party_size: Option<i32>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub status: Option<ReservationStatus>,
}

/// Provider-side correlation ids attached when a payment settles or an
/// outbound checkout/intent is created.
#[derive(Debug, Clone, Default)]
pub struct PaymentReference {
    pub payment_intent_id: Option<String>,
    pub checkout_session_id: Option<String>,
}

impl PaymentReference {
    pub fn checkout_session(id: impl Into<String>) -> Self {
        Self {
            payment_intent_id: None,
            checkout_session_id: Some(id.into()),
        }
    }

    pub fn payment_intent(id: impl Into<String>) -> Self {
        Self {
            payment_intent_id: Some(id.into()),
            checkout_session_id: None,
        }
    }
}
