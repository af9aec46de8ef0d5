use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use freightwatch_provider::{DispatchReceipt, EmailDispatch, EmailNotifier, ProviderError};

use crate::config::SendgridConfig;

/// Email adapter backed by the SendGrid v3 mail-send API.
pub struct SendgridMailer {
    config: SendgridConfig,
    client: Client,
}

impl SendgridMailer {
    /// Create the adapter with a default HTTP client.
    pub fn new(config: SendgridConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Create the adapter with a shared HTTP client.
    #[must_use]
    pub fn with_client(config: SendgridConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn send_url(&self) -> String {
        format!("{}/v3/mail/send", self.config.api_base_url)
    }
}

#[async_trait]
impl EmailNotifier for SendgridMailer {
    fn name(&self) -> &str {
        "sendgrid"
    }

    fn priority(&self) -> u16 {
        self.config.priority
    }

    async fn is_available(&self) -> bool {
        self.config.is_configured()
    }

    #[instrument(skip(self, email), fields(delivery_id = %email.delivery_id, provider = "sendgrid"))]
    async fn send(&self, email: &EmailDispatch) -> Result<DispatchReceipt, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Configuration("no SendGrid API key".into()))?;

        let body = json!({
            "personalizations": [{ "to": [{ "email": email.to }] }],
            "from": { "email": self.config.from_email },
            "subject": email.subject,
            "content": [{ "type": "text/plain", "value": email.body }],
            "custom_args": { "delivery_id": email.delivery_id.to_string() },
        });

        debug!(to = %email.to, "sending email via SendGrid");

        let response = self
            .client
            .post(self.send_url())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(std::time::Duration::from_secs(
                        self.config.timeout_seconds,
                    ))
                } else {
                    ProviderError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("SendGrid rate limit hit");
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ExecutionFailed(format!(
                "HTTP {status}: {body}"
            )));
        }

        // SendGrid acknowledges with 202 and an X-Message-Id header.
        let message_id = response
            .headers()
            .get("X-Message-Id")
            .and_then(|value| value.to_str().ok())
            .map_or_else(
                || format!("sendgrid-{}", Uuid::new_v4()),
                ToOwned::to_owned,
            );

        Ok(DispatchReceipt {
            provider: self.name().to_owned(),
            message_id,
        })
    }
}
