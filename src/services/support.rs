//! In-memory repository doubles for service-level tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{Actor, ActorRole, DirectoryUser, Reservation, Tour};
use crate::repositories::{InsertReservation, ReservationRepository, TourRepository, UserDirectory};
use crate::utils::error::AppError;

#[derive(Default)]
struct ReservationStore {
    rows: Vec<Reservation>,
    next_id: i64,
}

#[derive(Default)]
pub struct InMemoryReservations {
    inner: Mutex<ReservationStore>,
}

impl InMemoryReservations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.inner.lock().unwrap().rows.len()
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservations {
    async fn insert(&self, record: InsertReservation) -> Result<Reservation, AppError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let reservation = Reservation {
            id: inner.next_id,
            tour_id: record.tour_id,
            user_id: record.user_id,
            status: record.status,
            customer_name: record.customer_name,
            customer_email: record.customer_email,
            party_size: record.party_size,
            requested_date: record.requested_date,
            modified_at: None,
            created_at: Utc::now(),
            updated_at: None,
            created_by: record.created_by,
            updated_by: None,
            payment_intent_id: record.payment_intent_id,
            checkout_session_id: record.checkout_session_id,
        };
        inner.rows.push(reservation.clone());
        Ok(reservation)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Reservation>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.rows.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<Option<Reservation>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .rows
            .iter()
            .find(|r| r.payment_intent_id.as_deref() == Some(intent_id))
            .cloned())
    }

    async fn find_by_checkout_session(
        &self,
        session_id: &str,
    ) -> Result<Option<Reservation>, AppError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .rows
            .iter()
            .find(|r| r.checkout_session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn list_all(&self, offset: i64, limit: i64) -> Result<Vec<Reservation>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut rows = inner.rows.clone();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Reservation>, AppError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Reservation> = inner
            .rows
            .iter()
            .filter(|r| r.user_id == Some(user_id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn update(&self, reservation: &Reservation) -> Result<Reservation, AppError> {
        let mut inner = self.inner.lock().unwrap();
        let slot = inner
            .rows
            .iter_mut()
            .find(|r| r.id == reservation.id)
            .ok_or_else(|| AppError::NotFound(format!("Reservation {}", reservation.id)))?;
        *slot = reservation.clone();
        Ok(slot.clone())
    }
}

#[derive(Default)]
pub struct InMemoryTours {
    tours: Mutex<Vec<Tour>>,
}

impl InMemoryTours {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, t: Tour) -> Self {
        self.tours.lock().unwrap().push(t);
        self
    }
}

#[async_trait]
impl TourRepository for InMemoryTours {
    async fn find_by_id(&self, id: i64) -> Result<Option<Tour>, AppError> {
        Ok(self.tours.lock().unwrap().iter().find(|t| t.id == id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryUsers {
    users: Mutex<Vec<DirectoryUser>>,
}

impl InMemoryUsers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, u: DirectoryUser) -> Self {
        self.users.lock().unwrap().push(u);
        self
    }
}

#[async_trait]
impl UserDirectory for InMemoryUsers {
    async fn find_by_email(&self, email: &str) -> Result<Option<DirectoryUser>, AppError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }
}

pub fn tour(id: i64, capacity: Option<i32>, active: Option<bool>) -> Tour {
    Tour {
        id,
        name: format!("Tour {id}"),
        capacity,
        price_cents: 10_000,
        active,
        operator_id: Some(12),
        guide_id: None,
        created_at: Utc::now(),
        updated_at: None,
    }
}

pub fn customer(name: &str, email: &str) -> Actor {
    Actor {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: name.to_string(),
        role: ActorRole::Customer,
    }
}

pub fn admin() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        email: "admin@example.com".to_string(),
        name: "Admin".to_string(),
        role: ActorRole::Admin,
    }
}

pub fn directory_user(email: &str) -> DirectoryUser {
    DirectoryUser {
        id: Uuid::new_v4(),
        email: email.to_string(),
        first_name: Some("Test".to_string()),
        last_name: Some("User".to_string()),
        active: true,
        created_at: Utc::now(),
    }
}
