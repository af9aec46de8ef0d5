use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use freightwatch_provider::{
    DispatchReceipt, ProviderError, SmsDispatch, SmsNotifier, truncate_sms,
};

use crate::config::TwilioConfig;
use crate::error::TwilioError;
use crate::types::{TwilioApiResponse, TwilioSendMessageRequest};

/// SMS notifier that dispatches through the Twilio Messages API.
pub struct TwilioSmsNotifier {
    config: TwilioConfig,
    client: Client,
}

impl TwilioSmsNotifier {
    /// Create the adapter with a default HTTP client.
    pub fn new(config: TwilioConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Create the adapter with a shared HTTP client.
    #[must_use]
    pub fn with_client(config: TwilioConfig, client: Client) -> Self {
        Self { config, client }
    }

    fn messages_url(&self, account_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{account_sid}/Messages.json",
            self.config.api_base_url
        )
    }

    async fn send_message(
        &self,
        request: &TwilioSendMessageRequest,
    ) -> Result<TwilioApiResponse, TwilioError> {
        let account_sid = self
            .config
            .account_sid
            .as_deref()
            .ok_or_else(|| TwilioError::Configuration("no account SID".into()))?;
        let auth_token = self
            .config
            .auth_token
            .as_deref()
            .ok_or_else(|| TwilioError::Configuration("no auth token".into()))?;

        debug!(to = %request.to, "sending SMS via Twilio");

        let response = self
            .client
            .post(self.messages_url(account_sid))
            .basic_auth(account_sid, Some(auth_token))
            .form(request)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Twilio API rate limit hit");
            return Err(TwilioError::RateLimited);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TwilioError::Api(format!("HTTP {status}: {body}")));
        }

        let api_response: TwilioApiResponse = response.json().await?;

        if let Some(code) = api_response.error_code {
            let msg = api_response
                .error_message
                .unwrap_or_else(|| format!("error code {code}"));
            return Err(TwilioError::Api(msg));
        }

        Ok(api_response)
    }
}

#[async_trait]
impl SmsNotifier for TwilioSmsNotifier {
    fn name(&self) -> &str {
        "twilio"
    }

    fn priority(&self) -> u16 {
        self.config.priority
    }

    async fn is_available(&self) -> bool {
        self.config.is_configured()
    }

    #[instrument(skip(self, sms), fields(delivery_id = %sms.delivery_id, provider = "twilio"))]
    async fn send(&self, sms: &SmsDispatch) -> Result<DispatchReceipt, ProviderError> {
        let from = self
            .config
            .from_number
            .clone()
            .ok_or_else(|| ProviderError::Configuration("no from number configured".into()))?;

        let body = truncate_sms(&sms.delivery_id.to_string(), &sms.body);

        let request = TwilioSendMessageRequest {
            to: sms.to.clone(),
            from,
            body,
        };

        let api_response = self.send_message(&request).await?;

        let message_id = api_response
            .sid
            .ok_or_else(|| ProviderError::Serialization("response missing sid".into()))?;

        debug!(sid = %message_id, status = ?api_response.status, "SMS accepted by Twilio");

        Ok(DispatchReceipt {
            provider: self.name().to_owned(),
            message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    /// A minimal mock HTTP server built on tokio that returns canned
    /// responses and captures the request body.
    struct MockTwilioServer {
        listener: tokio::net::TcpListener,
        base_url: String,
    }

    impl MockTwilioServer {
        async fn start() -> Self {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("failed to bind mock server");
            let port = listener.local_addr().unwrap().port();
            let base_url = format!("http://127.0.0.1:{port}");
            Self { listener, base_url }
        }

        async fn respond_once(self, status_code: u16, body: &str) -> String {
            let body = body.to_owned();
            let (mut stream, _) = self.listener.accept().await.unwrap();

            use tokio::io::{AsyncReadExt, AsyncWriteExt};

            let mut buf = vec![0u8; 16384];
            let n = stream.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).into_owned();

            let response = format!(
                "HTTP/1.1 {status_code} OK\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\
                 \r\n\
                 {body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        }
    }

    fn configured(base_url: &str) -> TwilioSmsNotifier {
        let config = TwilioConfig::new()
            .with_credentials("AC123", "token")
            .with_from_number("+15551234567")
            .with_api_base_url(base_url);
        TwilioSmsNotifier::new(config).unwrap()
    }

    fn dispatch(body: &str) -> SmsDispatch {
        SmsDispatch {
            to: "+15559876543".into(),
            body: body.into(),
            delivery_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn unavailable_without_credentials() {
        let notifier = TwilioSmsNotifier::new(TwilioConfig::new()).unwrap();
        assert!(!notifier.is_available().await);
    }

    #[tokio::test]
    async fn send_success_returns_sid() {
        let server = MockTwilioServer::start().await;
        let notifier = configured(&server.base_url);

        let response_body =
            r#"{"sid":"SM123","status":"queued","error_code":null,"error_message":null}"#;
        let server_handle = tokio::spawn(async move {
            server.respond_once(200, response_body).await
        });

        let receipt = notifier.send(&dispatch("Short update.")).await.unwrap();
        let request = server_handle.await.unwrap();

        assert_eq!(receipt.message_id, "SM123");
        assert_eq!(receipt.provider, "twilio");
        assert!(request.contains("To=%2B15559876543"));
        assert!(request.contains("From=%2B15551234567"));
    }

    #[tokio::test]
    async fn send_truncates_long_messages() {
        let server = MockTwilioServer::start().await;
        let notifier = configured(&server.base_url);

        let response_body =
            r#"{"sid":"SM456","status":"queued","error_code":null,"error_message":null}"#;
        let server_handle = tokio::spawn(async move {
            server.respond_once(200, response_body).await
        });

        let long_body = "x".repeat(500);
        notifier.send(&dispatch(&long_body)).await.unwrap();
        let request = server_handle.await.unwrap();

        // The urlencoded Body field never carries more than 160 chars of
        // message text; the raw 500-char body must not appear.
        assert!(!request.contains(&"x".repeat(200)));
    }

    #[tokio::test]
    async fn api_error_payload_fails() {
        let server = MockTwilioServer::start().await;
        let notifier = configured(&server.base_url);

        let response_body = r#"{"sid":null,"status":null,"error_code":20003,"error_message":"Authentication Error"}"#;
        let server_handle = tokio::spawn(async move {
            server.respond_once(200, response_body).await
        });

        let err = notifier.send(&dispatch("hello")).await.unwrap_err();
        server_handle.await.unwrap();

        assert!(matches!(err, ProviderError::ExecutionFailed(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn rate_limited_is_retryable() {
        let server = MockTwilioServer::start().await;
        let notifier = configured(&server.base_url);

        let server_handle = tokio::spawn(async move {
            server
                .respond_once(429, r#"{"error_code":429,"error_message":"rate limited"}"#)
                .await
        });

        let err = notifier.send(&dispatch("hello")).await.unwrap_err();
        server_handle.await.unwrap();

        assert!(matches!(err, ProviderError::RateLimited));
        assert!(err.is_retryable());
    }
}
