use chrono::{DateTime, Utc};

use crate::models::Tour;
use crate::utils::error::AppError;

/// Pure admission checks for a new reservation. No side effects; the caller
/// aborts before any write on failure.
///
/// Capacity is checked per reservation only. Party sizes are not aggregated
/// across existing reservations, so concurrent bookings can jointly exceed a
/// tour's capacity.
pub fn validate_new_reservation(
    tour: &Tour,
    party_size: i32,
    requested_date: DateTime<Utc>,
) -> Result<(), AppError> {
    if party_size <= 0 {
        return Err(AppError::InvalidPartySize(party_size));
    }

    if let Some(capacity) = tour.capacity {
        if party_size > capacity {
            return Err(AppError::CapacityExceeded {
                requested: party_size,
                capacity,
            });
        }
    }

    if tour.active == Some(false) {
        return Err(AppError::TourInactive);
    }

    // Calendar-date comparison; the time of day is ignored.
    if requested_date.date_naive() < Utc::now().date_naive() {
        return Err(AppError::PastDate);
    }

    Ok(())
}
