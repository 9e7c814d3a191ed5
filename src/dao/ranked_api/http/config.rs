use super::error::{HttpApiError, HttpResult};

/// Runtime configuration describing how to reach the ranked backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Bearer token seeded into the session store at startup.
    pub token: Option<String>,
}

impl ApiConfig {
    /// Construct a configuration from an explicit base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
        }
    }

    /// Attach a bearer token to the configuration.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Build a configuration by reading the expected environment variables.
    pub fn from_env() -> HttpResult<Self> {
        let base_url = std::env::var("COURTSIDE_API_URL").map_err(|_| {
            HttpApiError::MissingEnvVar {
                var: "COURTSIDE_API_URL",
            }
        })?;

        let mut config = Self::new(base_url);
        if let Some(token) = std::env::var("COURTSIDE_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty())
        {
            config = config.with_token(token);
        }

        Ok(config)
    }
}
