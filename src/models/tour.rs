use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A bookable guided excursion. Read-only from the reservation core's
/// perspective; owned and mutated elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tour {
    pub id: i64,
    pub name: String,
    /// Maximum party size per reservation. `None` disables the capacity check.
    pub capacity: Option<i32>,
    /// Price in integer minor units (cents).
    pub price_cents: i64,
    /// Soft-delete gate for public visibility. `None` means the tour predates
    /// the flag and is treated as active.
    pub active: Option<bool>,
    pub operator_id: Option<i64>,
    pub guide_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}
