use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::utils::error::AppError;

/// Client handle for a provider payment intent (direct-charge flow).
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentHandle {
    pub id: String,
    pub client_secret: Option<String>,
}

/// Client handle for a provider hosted-checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionHandle {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
    pub product_name: String,
    pub amount_cents: i64,
    pub reservation_id: i64,
    pub success_url: String,
    pub cancel_url: String,
}

/// Outbound payment-provider surface. The reservation id travels in the
/// provider object's metadata so the webhook reconciler can correlate the
/// asynchronous confirmation back to the row.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        amount_cents: i64,
        reservation_id: i64,
    ) -> Result<PaymentIntentHandle, AppError>;

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, AppError>;
}

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
const CURRENCY: &str = "usd";

/// Stripe REST implementation. The secret key is constructor-fed
/// configuration, never process-wide state.
pub struct StripeGateway {
    http: reqwest::Client,
    secret_key: String,
}

impl StripeGateway {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.into(),
        }
    }

    async fn post_form<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        form: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .post(format!("{STRIPE_API_BASE}/{path}"))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("Stripe request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalServiceError(format!(
                "Stripe returned {status}: {body}"
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AppError::ExternalServiceError(format!("Invalid Stripe response: {e}")))
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(
        &self,
        amount_cents: i64,
        reservation_id: i64,
    ) -> Result<PaymentIntentHandle, AppError> {
        let form = [
            ("amount", amount_cents.to_string()),
            ("currency", CURRENCY.to_string()),
            ("metadata[reserva_id]", reservation_id.to_string()),
        ];
        let intent: PaymentIntentHandle = self.post_form("payment_intents", &form).await?;
        info!(intent_id = %intent.id, reservation_id, "Created payment intent");
        Ok(intent)
    }

    async fn create_checkout_session(
        &self,
        request: CheckoutSessionRequest,
    ) -> Result<CheckoutSessionHandle, AppError> {
        let form = [
            ("mode", "payment".to_string()),
            ("success_url", request.success_url),
            ("cancel_url", request.cancel_url),
            (
                "line_items[0][price_data][currency]",
                CURRENCY.to_string(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                request.amount_cents.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                request.product_name,
            ),
            ("line_items[0][quantity]", "1".to_string()),
            (
                "metadata[reserva_id]",
                request.reservation_id.to_string(),
            ),
        ];
        let session: CheckoutSessionHandle = self.post_form("checkout/sessions", &form).await?;
        info!(session_id = %session.id, "Created checkout session");
        Ok(session)
    }
}
