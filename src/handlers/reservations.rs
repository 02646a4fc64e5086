use axum::extract::{Path, Query, State};
use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use uuid::Uuid;

use crate::handlers::require_admin;
use crate::models::{Actor, AdminNewReservation, NewReservation, PaymentReference, ReservationPatch};
use crate::services::{Access, Page, ReservationFilter};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    offset: Option<i64>,
    limit: Option<i64>,
}

impl From<PageQuery> for Page {
    fn from(q: PageQuery) -> Self {
        let default = Page::default();
        // Negative values would reach Postgres OFFSET/LIMIT and fail the
        // query; clamp instead.
        Page {
            offset: q.offset.unwrap_or(default.offset).max(0),
            limit: q.limit.unwrap_or(default.limit).max(0),
        }
    }
}

pub async fn create_reservation(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<NewReservation>,
) -> Result<Response, AppError> {
    let reservation = state.reservations.create(input, &actor).await?;
    Ok(created(reservation, "Reservation created").into_response())
}

pub async fn list_my_reservations(
    State(state): State<AppState>,
    actor: Actor,
    Query(page): Query<PageQuery>,
) -> Result<Response, AppError> {
    let reservations = state
        .reservations
        .list(ReservationFilter::ByUser(actor.id), page.into())
        .await?;
    Ok(success(reservations, "Reservations retrieved").into_response())
}

pub async fn get_reservation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let access = if actor.is_admin() {
        Access::Admin
    } else {
        Access::Owner(actor.id)
    };
    let reservation = state.reservations.get(id, access).await?;
    Ok(success(reservation, "Reservation retrieved").into_response())
}

pub async fn admin_create_reservation(
    State(state): State<AppState>,
    actor: Actor,
    Json(input): Json<AdminNewReservation>,
) -> Result<Response, AppError> {
    require_admin(&actor)?;
    let reservation = state.reservations.create_as_admin(input, &actor).await?;
    Ok(created(reservation, "Reservation created").into_response())
}

pub async fn admin_list_reservations(
    State(state): State<AppState>,
    actor: Actor,
    Query(page): Query<PageQuery>,
) -> Result<Response, AppError> {
    require_admin(&actor)?;
    let reservations = state
        .reservations
        .list(ReservationFilter::All, page.into())
        .await?;
    Ok(success(reservations, "Reservations retrieved").into_response())
}

pub async fn admin_list_reservations_by_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<Response, AppError> {
    require_admin(&actor)?;
    let reservations = state
        .reservations
        .list(ReservationFilter::ByUser(user_id), page.into())
        .await?;
    Ok(success(reservations, "Reservations retrieved").into_response())
}

pub async fn admin_get_reservation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    require_admin(&actor)?;
    let reservation = state.reservations.get(id, Access::Admin).await?;
    Ok(success(reservation, "Reservation retrieved").into_response())
}

pub async fn admin_update_reservation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
    Json(patch): Json<ReservationPatch>,
) -> Result<Response, AppError> {
    require_admin(&actor)?;
    let reservation = state.reservations.update(id, patch, &actor).await?;
    Ok(success(reservation, "Reservation updated").into_response())
}

/// DELETE semantics, implemented as a status transition; the row survives.
pub async fn admin_cancel_reservation(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    require_admin(&actor)?;
    let reservation = state.reservations.cancel(id, &actor).await?;
    Ok(success(reservation, "Reservation cancelled").into_response())
}

pub async fn admin_mark_reservation_paid(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    require_admin(&actor)?;
    let reservation = state
        .reservations
        .mark_paid(id, PaymentReference::default(), Some(actor.id))
        .await?;
    Ok(success(reservation, "Reservation marked paid").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_falls_back_to_defaults() {
        let page: Page = PageQuery {
            offset: None,
            limit: None,
        }
        .into();
        assert_eq!(page.offset, Page::default().offset);
        assert_eq!(page.limit, Page::default().limit);
    }

    #[test]
    fn negative_paging_values_are_clamped_to_zero() {
        let page: Page = PageQuery {
            offset: Some(-5),
            limit: Some(-1),
        }
        .into();
        assert_eq!(page.offset, 0);
        assert_eq!(page.limit, 0);
    }
}
