/// Configuration for the Twilio SMS adapter.
#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    /// Default sender number (E.164).
    pub from_number: Option<String>,
    /// API base URL.
    pub api_base_url: String,
    /// Selection priority; lower is preferred.
    pub priority: u16,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl TwilioConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            api_base_url: "https://api.twilio.com".to_owned(),
            priority: 10,
            timeout_seconds: 30,
        }
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        account_sid: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        self.account_sid = Some(account_sid.into());
        self.auth_token = Some(auth_token.into());
        self
    }

    #[must_use]
    pub fn with_from_number(mut self, from_number: impl Into<String>) -> Self {
        self.from_number = Some(from_number.into());
        self
    }

    /// Override the API base URL (used by tests).
    #[must_use]
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    /// Whether the configuration is complete enough to serve requests.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        let set = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        set(&self.account_sid) && set(&self.auth_token) && set(&self.from_number)
    }
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self::new()
    }
}
