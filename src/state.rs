use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    PaymentGateway, PaymentWebhookReconciler, ReservationService, SignatureVerifier,
};

/// Shared handler state. Everything is behind an `Arc`, so cloning per
/// request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub reservations: Arc<ReservationService>,
    pub reconciler: Arc<PaymentWebhookReconciler>,
    pub verifier: Arc<dyn SignatureVerifier>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub config: Arc<Config>,
}
