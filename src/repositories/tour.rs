use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::Tour;
use crate::utils::error::AppError;

/// Read-only view of the tour catalogue. Tours are owned and mutated by the
/// catalogue side of the system; the reservation core only reads capacity,
/// price and the active flag.
#[async_trait]
pub trait TourRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Tour>, AppError>;
}

pub struct PgTourRepository {
    pool: PgPool,
}

impl PgTourRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TourRepository for PgTourRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Tour>, AppError> {
        let tour = sqlx::query_as::<_, Tour>(
            "SELECT id, name, capacity, price_cents, active, operator_id, guide_id, \
             created_at, updated_at \
             FROM tours WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tour)
    }
}
