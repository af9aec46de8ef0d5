use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument, warn};

use freightwatch_core::{DelayContext, GeneratedMessage};
use freightwatch_provider::{MessageGenerator, ProviderError};

use crate::config::OpenAiConfig;

const SYSTEM_PROMPT: &str = "You write short, friendly delivery-delay notifications for \
freight customers. Respond with a JSON object containing exactly two string fields: \
\"subject\" and \"message\". Mention the tracking number, the expected delay in minutes, \
the traffic condition, and the new estimated arrival. Do not invent other facts.";

/// Message generator over an OpenAI-compatible chat completions API.
#[derive(Debug)]
pub struct OpenAiMessageGenerator {
    config: OpenAiConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct GeneratedPayload {
    subject: String,
    message: String,
}

impl OpenAiMessageGenerator {
    /// Create the generator with a default HTTP client.
    pub fn new(config: OpenAiConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Configuration(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Create the generator with a shared HTTP client.
    #[must_use]
    pub fn with_client(config: OpenAiConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Build the user message summarising the delay for the model.
    fn build_delay_summary(context: &DelayContext) -> String {
        format!(
            "Tracking number: {}\nRoute: {} to {}\nDelay: {} minutes\nTraffic: {}\n\
             Originally scheduled arrival: {}\nNew estimated arrival: {}",
            context.tracking_number,
            context.origin_address,
            context.destination_address,
            context.delay_minutes,
            context.condition,
            context.scheduled_arrival.format("%Y-%m-%d %H:%M UTC"),
            context.eta_display(),
        )
    }

    /// Parse the model response, stripping markdown code fences if present.
    fn parse_response(content: &str) -> Result<GeneratedPayload, ProviderError> {
        let trimmed = content.trim();

        let json_str = if trimmed.starts_with("```") {
            let without_opening = if let Some(rest) = trimmed.strip_prefix("```json") {
                rest
            } else {
                trimmed.strip_prefix("```").unwrap_or(trimmed)
            };
            without_opening
                .strip_suffix("```")
                .unwrap_or(without_opening)
                .trim()
        } else {
            trimmed
        };

        serde_json::from_str::<GeneratedPayload>(json_str).map_err(|e| {
            ProviderError::Serialization(format!(
                "failed to parse model response as JSON: {e}. Raw content: {content}"
            ))
        })
    }
}

#[async_trait]
impl MessageGenerator for OpenAiMessageGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    fn priority(&self) -> u16 {
        self.config.priority
    }

    async fn is_available(&self) -> bool {
        self.config.is_configured()
    }

    #[instrument(skip(self, context), fields(provider = "openai", model = %self.config.model))]
    async fn generate(&self, context: &DelayContext) -> Result<GeneratedMessage, ProviderError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Configuration("no API key".into()))?;

        let request_body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": Self::build_delay_summary(context) }
            ]
        });

        debug!(endpoint = %self.config.endpoint, "requesting delay message");

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request_body)
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
            warn!("chat completions rate limit hit");
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ExecutionFailed(format!(
                "HTTP {status}: {body}"
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Serialization(format!("bad API response: {e}")))?;

        let content = response_json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                ProviderError::Serialization(format!("unexpected response format: {response_json}"))
            })?;

        let token_count = response_json
            .get("usage")
            .and_then(|u| u.get("total_tokens"))
            .and_then(serde_json::Value::as_u64)
            .and_then(|t| u32::try_from(t).ok());

        let payload = Self::parse_response(content)?;

        Ok(GeneratedMessage {
            subject: payload.subject,
            body: payload.message,
            model_name: self.config.model.clone(),
            token_count,
        })
    }
}
