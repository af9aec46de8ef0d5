use serde::Deserialize;

use freightwatch_workflow::WorkflowConfig;

/// Top-level server configuration, loaded from a TOML file with
/// environment-variable overrides applied on top.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FreightwatchConfig {
    pub server: ServerSection,
    pub cron: CronSection,
    pub workflow: WorkflowSection,
    pub store: StoreSection,
    pub providers: ProvidersSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CronSection {
    /// Shared secret for the fleet-sweep endpoint. Required in
    /// production; the endpoint answers 401 while unset.
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorkflowSection {
    pub cutoff_hours: f64,
    pub default_threshold_minutes: u32,
    pub task_queue: String,
}

impl Default for WorkflowSection {
    fn default() -> Self {
        let defaults = WorkflowConfig::default();
        Self {
            cutoff_hours: defaults.cutoff_hours,
            default_threshold_minutes: defaults.default_threshold_minutes,
            task_queue: defaults.task_queue,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// `"memory"` or `"postgres"`.
    pub backend: String,
    /// Connection URL for the postgres backend.
    pub url: Option<String>,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: "memory".to_owned(),
            url: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersSection {
    /// When set, the mock adapters are the only registered adapters.
    pub force_mock_adapters: bool,
    pub google_maps: GoogleMapsSection,
    pub sendgrid: SendgridSection,
    pub smtp: SmtpSection,
    pub twilio: TwilioSection,
    pub openai: OpenAiSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GoogleMapsSection {
    pub api_key: Option<String>,
    pub priority: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SendgridSection {
    pub api_key: Option<String>,
    pub from_email: Option<String>,
    pub priority: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SmtpSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: Option<bool>,
    pub from_email: Option<String>,
    pub priority: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TwilioSection {
    pub account_sid: Option<String>,
    pub auth_token: Option<String>,
    pub from_number: Option<String>,
    pub priority: Option<u16>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpenAiSection {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub priority: Option<u16>,
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

impl FreightwatchConfig {
    /// Apply environment-variable overrides on top of the file values.
    pub fn apply_env(&mut self) {
        if let Some(secret) = env_string("CRON_SECRET") {
            self.cron.secret = Some(secret);
        }
        if let Some(hours) = env_string("WORKFLOW_CUTOFF_HOURS").and_then(|v| v.parse().ok()) {
            self.workflow.cutoff_hours = hours;
        }
        if let Some(minutes) =
            env_string("WORKFLOW_DEFAULT_THRESHOLD_MINUTES").and_then(|v| v.parse().ok())
        {
            self.workflow.default_threshold_minutes = minutes;
        }
        if let Some(queue) = env_string("TEMPORAL_TASK_QUEUE") {
            self.workflow.task_queue = queue;
        }
        if let Some(url) = env_string("DATABASE_URL") {
            self.store.backend = "postgres".to_owned();
            self.store.url = Some(url);
        }
        if let Some(force) =
            env_string("FORCE_NOTIFICATION_MOCK_ADAPTER").and_then(|v| v.parse().ok())
        {
            self.providers.force_mock_adapters = force;
        }
        if let Some(key) = env_string("GOOGLE_MAPS_API_KEY") {
            self.providers.google_maps.api_key = Some(key);
        }
        if let Some(key) = env_string("SENDGRID_API_KEY") {
            self.providers.sendgrid.api_key = Some(key);
        }
        if let Some(from) = env_string("SENDGRID_FROM_EMAIL") {
            self.providers.sendgrid.from_email = Some(from);
        }
        if let Some(sid) = env_string("TWILIO_ACCOUNT_SID") {
            self.providers.twilio.account_sid = Some(sid);
        }
        if let Some(token) = env_string("TWILIO_AUTH_TOKEN") {
            self.providers.twilio.auth_token = Some(token);
        }
        if let Some(from) = env_string("TWILIO_FROM_NUMBER") {
            self.providers.twilio.from_number = Some(from);
        }
        if let Some(key) = env_string("OPENAI_API_KEY") {
            self.providers.openai.api_key = Some(key);
        }
    }

    /// The workflow-layer view of this configuration.
    #[must_use]
    pub fn workflow_config(&self) -> WorkflowConfig {
        WorkflowConfig {
            cutoff_hours: self.workflow.cutoff_hours,
            default_threshold_minutes: self.workflow.default_threshold_minutes,
            task_queue: self.workflow.task_queue.clone(),
            ..WorkflowConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: FreightwatchConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.workflow.cutoff_hours, 1.0);
        assert_eq!(config.workflow.default_threshold_minutes, 30);
        assert_eq!(config.workflow.task_queue, "freight-delay-queue");
        assert_eq!(config.store.backend, "memory");
        assert!(!config.providers.force_mock_adapters);
    }

    #[test]
    fn sections_parse_from_toml() {
        let config: FreightwatchConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9090

            [cron]
            secret = "cron-secret"

            [workflow]
            cutoff_hours = 2.5
            default_threshold_minutes = 45

            [store]
            backend = "postgres"
            url = "postgres://localhost/freightwatch"

            [providers]
            force_mock_adapters = true

            [providers.twilio]
            account_sid = "AC123"
            auth_token = "token"
            from_number = "+15551234567"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.cron.secret.as_deref(), Some("cron-secret"));
        assert_eq!(config.workflow.cutoff_hours, 2.5);
        assert_eq!(config.store.backend, "postgres");
        assert!(config.providers.force_mock_adapters);
        assert_eq!(config.providers.twilio.account_sid.as_deref(), Some("AC123"));

        let workflow = config.workflow_config();
        assert_eq!(workflow.cutoff_hours, 2.5);
        assert_eq!(workflow.default_threshold_minutes, 45);
    }
}
