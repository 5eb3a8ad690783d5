//! Clients for the services the storefront talks to: payment providers, the email sender and
//! the image store.

mod email;
mod paypal;
mod storage;
mod stripe;

pub use email::{Mailer, OutgoingEmail};
pub use paypal::{PayPalCapture, PayPalClient, PayPalOrder};
pub use storage::ImageStore;
pub use stripe::{
    PaymentIntent, StripeClient, WebhookError, amount_in_cents, verify_webhook_signature,
};

use serde::de::DeserializeOwned;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} responded with {status}: {body}")]
    Rejected {
        provider: &'static str,
        status: u16,
        body: String,
    },
}

impl ProviderError {
    fn transport(provider: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| ProviderError::Transport { provider, source }
    }
}

/// Reads a successful JSON response, turning any other status into [`ProviderError::Rejected`].
async fn expect_json<T: DeserializeOwned>(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Rejected {
            provider,
            status: status.as_u16(),
            body,
        });
    }
    response
        .json()
        .await
        .map_err(ProviderError::transport(provider))
}
