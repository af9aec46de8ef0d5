/// Configuration for the OpenAI-compatible message generator.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// API key; the adapter reports unavailable while unset.
    pub api_key: Option<String>,
    /// Chat completions endpoint.
    pub endpoint: String,
    /// Model identifier.
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// Selection priority; lower is preferred.
    pub priority: u16,
}

impl OpenAiConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: None,
            endpoint: "https://api.openai.com/v1/chat/completions".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            temperature: 0.7,
            max_tokens: 400,
            timeout_seconds: 30,
            priority: 10,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the endpoint (used by tests and self-hosted gateways).
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self::new()
    }
}
