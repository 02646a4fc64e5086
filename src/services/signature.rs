use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::utils::error::AppError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies that an inbound webhook payload was signed by the payment
/// provider. Runs before any other processing; a failure rejects the
/// delivery with a client error and no database mutation.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, payload: &[u8], signature_header: &str) -> Result<(), AppError>;
}

/// Stripe's `Stripe-Signature` scheme: the header carries a unix timestamp
/// `t` and one or more `v1` HMAC-SHA256 signatures over `"{t}.{payload}"`.
pub struct StripeSignatureVerifier {
    secret: String,
    tolerance_secs: i64,
}

const DEFAULT_TOLERANCE_SECS: i64 = 300;

impl StripeSignatureVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }
}

impl SignatureVerifier for StripeSignatureVerifier {
    fn verify(&self, payload: &[u8], signature_header: &str) -> Result<(), AppError> {
        let mut timestamp: Option<i64> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp = value.parse().ok(),
                "v1" => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(AppError::InvalidSignature)?;
        if signatures.is_empty() {
            return Err(AppError::InvalidSignature);
        }

        // Stale timestamps are rejected to bound replay.
        if (Utc::now().timestamp() - timestamp).abs() > self.tolerance_secs {
            return Err(AppError::InvalidSignature);
        }

        let mut signed_payload = format!("{timestamp}.").into_bytes();
        signed_payload.extend_from_slice(payload);

        for candidate in signatures {
            let Ok(expected) = hex::decode(candidate) else {
                continue;
            };
            let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
                .map_err(|_| AppError::InvalidSignature)?;
            mac.update(&signed_payload);
            // verify_slice is constant-time.
            if mac.verify_slice(&expected).is_ok() {
                return Ok(());
            }
        }

        Err(AppError::InvalidSignature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &[u8], timestamp: i64, secret: &str) -> String {
        let mut signed = format!("{timestamp}.").into_bytes();
        signed.extend_from_slice(payload);
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(&signed);
        let signature = hex::encode(mac.finalize().into_bytes());
        format!("t={timestamp},v1={signature}")
    }

    #[test]
    fn accepts_a_correctly_signed_payload() {
        let verifier = StripeSignatureVerifier::new(SECRET);
        let payload = br#"{"id":"evt_1","type":"payment_intent.succeeded"}"#;
        let header = sign(payload, Utc::now().timestamp(), SECRET);
        assert!(verifier.verify(payload, &header).is_ok());
    }

    #[test]
    fn rejects_a_tampered_payload() {
        let verifier = StripeSignatureVerifier::new(SECRET);
        let header = sign(b"original", Utc::now().timestamp(), SECRET);
        assert!(matches!(
            verifier.verify(b"tampered", &header),
            Err(AppError::InvalidSignature)
        ));
    }

    #[test]
    fn rejects_a_signature_from_the_wrong_secret() {
        let verifier = StripeSignatureVerifier::new(SECRET);
        let payload = b"payload";
        let header = sign(payload, Utc::now().timestamp(), "whsec_other");
        assert!(verifier.verify(payload, &header).is_err());
    }

    #[test]
    fn rejects_a_stale_timestamp() {
        let verifier = StripeSignatureVerifier::new(SECRET);
        let payload = b"payload";
        let header = sign(payload, Utc::now().timestamp() - 3600, SECRET);
        assert!(verifier.verify(payload, &header).is_err());
    }

    #[test]
    fn rejects_garbage_headers() {
        let verifier = StripeSignatureVerifier::new(SECRET);
        for header in ["", "t=abc,v1=zz", "v1=deadbeef", "t=123"] {
            assert!(verifier.verify(b"payload", header).is_err());
        }
    }
}
