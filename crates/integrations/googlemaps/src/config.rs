/// Configuration shared by the Google Maps adapters.
#[derive(Debug, Clone)]
pub struct GoogleMapsConfig {
    /// API key; both adapters report unavailable while unset.
    pub api_key: Option<String>,
    /// Base URL of the Routes API.
    pub routes_base_url: String,
    /// Base URL of the Geocoding API.
    pub geocode_base_url: String,
    /// Selection priority; lower is preferred.
    pub priority: u16,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl GoogleMapsConfig {
    /// Create a configuration with production endpoints and no key.
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: None,
            routes_base_url: "https://routes.googleapis.com".to_owned(),
            geocode_base_url: "https://maps.googleapis.com".to_owned(),
            priority: 10,
            timeout_seconds: 30,
        }
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the Routes API base URL (used by tests).
    #[must_use]
    pub fn with_routes_base_url(mut self, url: impl Into<String>) -> Self {
        self.routes_base_url = url.into();
        self
    }

    /// Override the Geocoding API base URL (used by tests).
    #[must_use]
    pub fn with_geocode_base_url(mut self, url: impl Into<String>) -> Self {
        self.geocode_base_url = url.into();
        self
    }

    /// Set the selection priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = priority;
        self
    }

    /// Whether the configuration is complete enough to serve requests.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }
}

impl Default for GoogleMapsConfig {
    fn default() -> Self {
        Self::new()
    }
}
