/// Configuration for the SendGrid HTTP mailer.
#[derive(Debug, Clone)]
pub struct SendgridConfig {
    /// API key; the adapter reports unavailable while unset.
    pub api_key: Option<String>,
    /// Sender address for outbound mail.
    pub from_email: String,
    /// API base URL.
    pub api_base_url: String,
    /// Selection priority; lower is preferred.
    pub priority: u16,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl SendgridConfig {
    #[must_use]
    pub fn new(from_email: impl Into<String>) -> Self {
        Self {
            api_key: None,
            from_email: from_email.into(),
            api_base_url: "https://api.sendgrid.com".to_owned(),
            priority: 10,
            timeout_seconds: 30,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
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

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
            && !self.from_email.is_empty()
    }
}

/// Configuration for the SMTP fallback mailer.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP relay host; the adapter reports unavailable while unset.
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Use STARTTLS on the relay connection.
    pub tls: bool,
    /// Sender address for outbound mail.
    pub from_email: String,
    /// Selection priority; lower is preferred.
    pub priority: u16,
}

impl SmtpConfig {
    #[must_use]
    pub fn new(from_email: impl Into<String>) -> Self {
        Self {
            host: None,
            port: 587,
            username: None,
            password: None,
            tls: true,
            from_email: from_email.into(),
            priority: 50,
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.host.as_deref().is_some_and(|host| !host.is_empty()) && !self.from_email.is_empty()
    }
}
