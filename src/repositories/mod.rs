pub mod reservation;
pub mod tour;
pub mod user;

pub use reservation::{InsertReservation, PgReservationRepository, ReservationRepository};
pub use tour::{PgTourRepository, TourRepository};
pub use user::{PgUserDirectory, UserDirectory};
