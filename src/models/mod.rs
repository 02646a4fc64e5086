pub mod reservation;
pub mod tour;
pub mod user;

pub use reservation::{
    AdminNewReservation, NewReservation, PaymentReference, Reservation, ReservationPatch,
    ReservationStatus,
};
pub use tour::Tour;
pub use user::{Actor, ActorRole, DirectoryUser};
