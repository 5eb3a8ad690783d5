use hmac::{Hmac, Mac};
use rust_decimal::{Decimal, RoundingStrategy, prelude::ToPrimitive};
use sha2::Sha256;
use tracing::{info, instrument};

use crate::{domain::OrderId, infra::StripeSettings};

use super::{ProviderError, expect_json};

const PROVIDER: &str = "Stripe";

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct StripeClient {
    client: reqwest::Client,
    settings: StripeSettings,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

impl StripeClient {
    pub fn new(settings: StripeSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_payment_intent(
        &self,
        amount_in_cents: i64,
        order_id: OrderId,
    ) -> Result<PaymentIntent, ProviderError> {
        let params = [
            ("amount", amount_in_cents.to_string()),
            ("currency", "usd".to_owned()),
            ("metadata[orderId]", order_id.to_string()),
        ];
        let response = self
            .client
            .post(format!("{}/v1/payment_intents", self.settings.api_url))
            .basic_auth(&self.settings.secret_key, Some(""))
            .form(&params)
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let intent: PaymentIntent = expect_json(PROVIDER, response).await?;
        info!("PaymentIntent {} created for order {order_id}", intent.id);
        Ok(intent)
    }

    pub fn verify_webhook(&self, signature_header: &str, payload: &[u8]) -> Result<(), WebhookError> {
        verify_webhook_signature(
            &self.settings.webhook_secret,
            signature_header,
            payload,
            jiff::Timestamp::now().as_second(),
            self.settings.webhook_tolerance_secs,
        )
    }
}

/// Converts an order total to the smallest currency unit, rounding to the nearest cent.
pub fn amount_in_cents(total: Decimal) -> Option<i64> {
    (total * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("Stripe-Signature header is malformed.")]
    MalformedHeader,
    #[error("Webhook timestamp is outside the tolerance window.")]
    Expired,
    #[error("Webhook signature does not match.")]
    Mismatch,
}

/// Checks a `Stripe-Signature: t=<unix>,v1=<hex hmac>` header against
/// `HMAC-SHA256(secret, "<t>.<payload>")`. Any of several `v1` entries may match.
pub fn verify_webhook_signature(
    secret: &str,
    signature_header: &str,
    payload: &[u8],
    now: i64,
    tolerance_secs: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(WebhookError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedHeader);
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(WebhookError::Expired);
    }

    let matches = signatures.into_iter().any(|signature| {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&expected).is_ok()
    });

    if matches {
        Ok(())
    } else {
        Err(WebhookError::Mismatch)
    }
}

//-------------------------- Tests -------------------------------

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    const SECRET: &str = "whsec_test";

    fn sign(timestamp: i64, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).expect("Key should be valid.");
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn totals_convert_to_cents() {
        assert_eq!(amount_in_cents(dec!(107.75)), Some(10775));
        assert_eq!(amount_in_cents(dec!(10.00)), Some(1000));
        assert_eq!(amount_in_cents(dec!(0.005)), Some(1));
    }

    #[test]
    fn correctly_signed_payloads_are_accepted() {
        let payload = br#"{"type":"charge.succeeded"}"#;
        let header = format!("t=1700000000,v1={}", sign(1_700_000_000, payload));

        assert_eq!(
            verify_webhook_signature(SECRET, &header, payload, 1_700_000_010, 300),
            Ok(())
        );
    }

    #[test]
    fn any_of_several_signatures_may_match() {
        let payload = b"{}";
        let header = format!("t=100,v1=deadbeef,v1={}", sign(100, payload));

        assert_eq!(verify_webhook_signature(SECRET, &header, payload, 100, 300), Ok(()));
    }

    #[test]
    fn tampered_payloads_are_rejected() {
        let header = format!("t=100,v1={}", sign(100, b"{\"amount\":100}"));

        assert_eq!(
            verify_webhook_signature(SECRET, &header, b"{\"amount\":1}", 100, 300),
            Err(WebhookError::Mismatch)
        );
    }

    #[test]
    fn stale_and_malformed_headers_are_rejected() {
        let payload = b"{}";
        let header = format!("t=100,v1={}", sign(100, payload));

        assert_eq!(
            verify_webhook_signature(SECRET, &header, payload, 1_000, 300),
            Err(WebhookError::Expired)
        );
        assert_eq!(
            verify_webhook_signature(SECRET, "v1=abc", payload, 100, 300),
            Err(WebhookError::MalformedHeader)
        );
        assert_eq!(
            verify_webhook_signature(SECRET, "t=100", payload, 100, 300),
            Err(WebhookError::MalformedHeader)
        );
    }
}
