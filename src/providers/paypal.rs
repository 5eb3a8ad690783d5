use rust_decimal::Decimal;
use tracing::{info, instrument};

use crate::infra::PayPalSettings;

use super::{ProviderError, expect_json};

const PROVIDER: &str = "PayPal";

#[derive(Clone)]
pub struct PayPalClient {
    client: reqwest::Client,
    settings: PayPalSettings,
}

#[derive(Debug, serde::Deserialize)]
struct AccessToken {
    access_token: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct PayPalOrder {
    pub id: String,
    pub status: String,
}

/// The parts of a capture response the storefront records.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct PayPalCapture {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub payer: Option<Payer>,
    #[serde(default)]
    pub purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Payer {
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct PurchaseUnit {
    pub payments: Option<Payments>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Payments {
    #[serde(default)]
    pub captures: Vec<Capture>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Capture {
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct Amount {
    pub value: String,
}

impl PayPalCapture {
    pub fn payer_email(&self) -> Option<&str> {
        self.payer.as_ref()?.email_address.as_deref()
    }

    /// The amount of the first capture, as reported by PayPal.
    pub fn captured_value(&self) -> Option<&str> {
        self.purchase_units
            .first()?
            .payments
            .as_ref()?
            .captures
            .first()
            .map(|capture| capture.amount.value.as_str())
    }
}

impl PayPalClient {
    pub fn new(settings: PayPalSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    async fn access_token(&self) -> Result<String, ProviderError> {
        let response = self
            .client
            .post(format!("{}/v1/oauth2/token", self.settings.api_url))
            .basic_auth(&self.settings.client_id, Some(&self.settings.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let token: AccessToken = expect_json(PROVIDER, response).await?;
        Ok(token.access_token)
    }

    #[instrument(skip(self))]
    pub async fn create_order(&self, price: Decimal) -> Result<PayPalOrder, ProviderError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .post(format!("{}/v2/checkout/orders", self.settings.api_url))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "intent": "CAPTURE",
                "purchase_units": [{
                    "amount": { "currency_code": "USD", "value": price.to_string() }
                }]
            }))
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        let order: PayPalOrder = expect_json(PROVIDER, response).await?;
        info!("PayPal order {} created with status {}", order.id, order.status);
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn capture_payment(
        &self,
        paypal_order_id: &str,
    ) -> Result<PayPalCapture, ProviderError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .post(format!(
                "{}/v2/checkout/orders/{paypal_order_id}/capture",
                self.settings.api_url
            ))
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(ProviderError::transport(PROVIDER))?;
        expect_json(PROVIDER, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_response_exposes_payer_and_amount() {
        let capture: PayPalCapture = serde_json::from_value(serde_json::json!({
            "id": "5O190127TN364715T",
            "status": "COMPLETED",
            "payer": { "email_address": "buyer@example.com" },
            "purchase_units": [{
                "payments": { "captures": [{ "amount": { "currency_code": "USD", "value": "107.75" } }] }
            }]
        }))
        .expect("Capture should deserialize.");

        assert_eq!(capture.payer_email(), Some("buyer@example.com"));
        assert_eq!(capture.captured_value(), Some("107.75"));
    }

    #[test]
    fn capture_response_tolerates_missing_details() {
        let capture: PayPalCapture = serde_json::from_value(serde_json::json!({
            "id": "1", "status": "COMPLETED"
        }))
        .expect("Capture should deserialize.");

        assert_eq!(capture.payer_email(), None);
        assert_eq!(capture.captured_value(), None);
    }
}
