pub mod payments;
pub mod reservation;
pub mod signature;
pub mod validation;
pub mod webhook;

#[cfg(test)]
pub(crate) mod support;

pub use payments::{PaymentGateway, StripeGateway};
pub use reservation::{Access, Page, ReservationFilter, ReservationService};
pub use signature::{SignatureVerifier, StripeSignatureVerifier};
pub use webhook::{PaymentWebhookReconciler, ReconcileOutcome, StripeEvent};
