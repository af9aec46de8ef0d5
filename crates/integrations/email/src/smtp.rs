use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, instrument};
use uuid::Uuid;

use freightwatch_provider::{DispatchReceipt, EmailDispatch, EmailNotifier, ProviderError};

use crate::config::SmtpConfig;

/// SMTP fallback mailer built on lettre's async transport.
pub struct SmtpMailer {
    config: SmtpConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the transport from the configuration.
    ///
    /// Returns [`ProviderError::Configuration`] if the relay cannot be
    /// constructed.
    pub fn new(config: SmtpConfig) -> Result<Self, ProviderError> {
        let host = config.host.clone().unwrap_or_default();
        let mut builder = if config.tls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&host)
                .map_err(|e| ProviderError::Configuration(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&host)
        };
        builder = builder.port(config.port);
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }
        let transport = builder.build();
        Ok(Self { config, transport })
    }

    /// Create the mailer with a pre-built transport (for testing).
    #[must_use]
    pub fn with_transport(
        config: SmtpConfig,
        transport: AsyncSmtpTransport<Tokio1Executor>,
    ) -> Self {
        Self { config, transport }
    }
}

#[async_trait]
impl EmailNotifier for SmtpMailer {
    fn name(&self) -> &str {
        "smtp"
    }

    fn priority(&self) -> u16 {
        self.config.priority
    }

    async fn is_available(&self) -> bool {
        self.config.is_configured()
    }

    #[instrument(skip(self, email), fields(delivery_id = %email.delivery_id, provider = "smtp"))]
    async fn send(&self, email: &EmailDispatch) -> Result<DispatchReceipt, ProviderError> {
        let message_id = format!("<{}@freightwatch>", Uuid::new_v4());

        let message = Message::builder()
            .from(
                self.config
                    .from_email
                    .parse()
                    .map_err(|e| ProviderError::Configuration(format!("bad from address: {e}")))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|e| ProviderError::ExecutionFailed(format!("bad recipient: {e}")))?)
            .subject(&email.subject)
            .message_id(Some(message_id.clone()))
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| ProviderError::ExecutionFailed(e.to_string()))?;

        debug!(to = %email.to, "sending email via SMTP relay");

        self.transport
            .send(message)
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        Ok(DispatchReceipt {
            provider: self.name().to_owned(),
            message_id,
        })
    }
}
