use anyhow::{Context, bail};
use tracing::info;

use crate::infra::EmailSettings;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Sends transactional email through the Resend HTTP API.
#[derive(Clone)]
pub struct Mailer {
    client: reqwest::Client,
    settings: EmailSettings,
}

impl Mailer {
    pub fn new(settings: EmailSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.settings.app_name
    }

    pub async fn send(&self, email: OutgoingEmail) -> Result<(), anyhow::Error> {
        if self.settings.api_key.is_empty() {
            info!(
                "Email delivery disabled. Would have sent \"{}\" to {}.",
                email.subject, email.to
            );
            return Ok(());
        }

        let response = self
            .client
            .post(format!("{}/emails", self.settings.api_url))
            .bearer_auth(&self.settings.api_key)
            .json(&serde_json::json!({
                "from": format!("{} <{}>", self.settings.app_name, self.settings.sender),
                "to": [email.to],
                "subject": email.subject,
                "html": email.html,
            }))
            .send()
            .await
            .with_context(|| format!("Could not reach email API to send \"{}\".", email.subject))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Email API rejected \"{}\" with {status}: {body}", email.subject);
        }
        info!("Sent \"{}\" to {}", email.subject, email.to);
        Ok(())
    }
}
