use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Reservation, ReservationStatus};
use crate::utils::error::AppError;

/// Everything needed to persist a new reservation row. Audit timestamps are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct InsertReservation {
    pub tour_id: i64,
    pub user_id: Option<Uuid>,
    pub status: ReservationStatus,
    pub customer_name: String,
    pub customer_email: String,
    pub party_size: i32,
    pub requested_date: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub payment_intent_id: Option<String>,
    pub checkout_session_id: Option<String>,
}

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    async fn insert(&self, record: InsertReservation) -> Result<Reservation, AppError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Reservation>, AppError>;
    async fn find_by_payment_intent(&self, intent_id: &str)
        -> Result<Option<Reservation>, AppError>;
    async fn find_by_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Reservation>, AppError>;
    /// Most recent first.
    async fn list_all(&self, offset: i64, limit: i64) -> Result<Vec<Reservation>, AppError>;
    async fn list_by_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reservation>, AppError>;
    /// Writes every mutable column of an existing row back. Callers read,
    /// mutate in memory, then persist.
    async fn update(&self, reservation: &Reservation) -> Result<Reservation, AppError>;
}

pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "id, tour_id, user_id, status, customer_name, customer_email, \
     party_size, requested_date, modified_at, created_at, updated_at, \
     created_by, updated_by, payment_intent_id, checkout_session_id";

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    async fn insert(&self, record: InsertReservation) -> Result<Reservation, AppError> {
        let sql = format!(
            "INSERT INTO reservations \
             (tour_id, user_id, status, customer_name, customer_email, party_size, \
              requested_date, created_by, payment_intent_id, checkout_session_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {SELECT_COLUMNS}"
        );
        let reservation = sqlx::query_as::<_, Reservation>(&sql)
            .bind(record.tour_id)
            .bind(record.user_id)
            .bind(record.status)
            .bind(&record.customer_name)
            .bind(&record.customer_email)
            .bind(record.party_size)
            .bind(record.requested_date)
            .bind(record.created_by)
            .bind(&record.payment_intent_id)
            .bind(&record.checkout_session_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(reservation)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Reservation>, AppError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM reservations WHERE id = $1");
        let reservation = sqlx::query_as::<_, Reservation>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(reservation)
    }

    async fn find_by_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<Reservation>, AppError> {
        let sql =
            format!("SELECT {SELECT_COLUMNS} FROM reservations WHERE payment_intent_id = $1");
        let reservation = sqlx::query_as::<_, Reservation>(&sql)
            .bind(intent_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(reservation)
    }

    async fn find_by_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Reservation>, AppError> {
        let sql =
            format!("SELECT {SELECT_COLUMNS} FROM reservations WHERE checkout_session_id = $1");
        let reservation = sqlx::query_as::<_, Reservation>(&sql)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(reservation)
    }

    async fn list_all(&self, offset: i64, limit: i64) -> Result<Vec<Reservation>, AppError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM reservations \
             ORDER BY created_at DESC, id DESC OFFSET $1 LIMIT $2"
        );
        let reservations = sqlx::query_as::<_, Reservation>(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(reservations)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reservation>, AppError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM reservations WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC OFFSET $2 LIMIT $3"
        );
        let reservations = sqlx::query_as::<_, Reservation>(&sql)
            .bind(user_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(reservations)
    }

    async fn update(&self, reservation: &Reservation) -> Result<Reservation, AppError> {
        let sql = format!(
            "UPDATE reservations SET \
             tour_id = $2, user_id = $3, status = $4, customer_name = $5, \
             customer_email = $6, party_size = $7, requested_date = $8, \
             modified_at = $9, updated_at = $10, updated_by = $11, \
             payment_intent_id = $12, checkout_session_id = $13 \
             WHERE id = $1 \
             RETURNING {SELECT_COLUMNS}"
        );
        let updated = sqlx::query_as::<_, Reservation>(&sql)
            .bind(reservation.id)
            .bind(reservation.tour_id)
            .bind(reservation.user_id)
            .bind(reservation.status)
            .bind(&reservation.customer_name)
            .bind(&reservation.customer_email)
            .bind(reservation.party_size)
            .bind(reservation.requested_date)
            .bind(reservation.modified_at)
            .bind(reservation.updated_at)
            .bind(reservation.updated_by)
            .bind(&reservation.payment_intent_id)
            .bind(&reservation.checkout_session_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Reservation {}", reservation.id)))?;

        Ok(updated)
    }
}
