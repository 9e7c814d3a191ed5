//! Client configuration: backend location, polling cadence and the court to open.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dto::CourtId;

/// Default location on disk where the client looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/ranked.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "COURTSIDE_RANKED_CONFIG_PATH";
const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
const DEFAULT_SESSION_PATH: &str = ".courtside/session.json";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 6;
const DEFAULT_TRANSITION_TIMEOUT_SECS: u64 = 10;

/// Immutable runtime configuration of the ranked client.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_base_url: String,
    pub poll_interval: Duration,
    /// Court opened at startup.
    pub court_id: Option<CourtId>,
    pub session_path: PathBuf,
    pub transition_timeout: Duration,
}

impl AppConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        api_base_url = %config.api_base_url,
                        poll_interval_secs = config.poll_interval.as_secs(),
                        "loaded ranked client config"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    api_base_url: Option<String>,
    poll_interval_secs: Option<u64>,
    court_id: Option<CourtId>,
    session_path: Option<PathBuf>,
    transition_timeout_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let api_base_url = value
            .api_base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        // a zero period would spin the scheduler
        let poll_interval_secs = value
            .poll_interval_secs
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS)
            .max(1);
        Self {
            api_base_url,
            poll_interval: Duration::from_secs(poll_interval_secs),
            court_id: value.court_id,
            session_path: value
                .session_path
                .filter(|path| !path.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_PATH)),
            transition_timeout: Duration::from_secs(
                value
                    .transition_timeout_secs
                    .unwrap_or(DEFAULT_TRANSITION_TIMEOUT_SECS)
                    .max(1),
            ),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_reads_as_defaults() {
        let config = AppConfig::parse("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.api_base_url, "http://localhost:5000");
        assert_eq!(config.poll_interval, Duration::from_secs(6));
        assert_eq!(config.session_path, PathBuf::from(".courtside/session.json"));
        assert_eq!(config.court_id, None);
    }

    #[test]
    fn explicit_values_are_normalised() {
        let config = AppConfig::parse(
            r#"{
                "api_base_url": "https://courts.example.org/",
                "poll_interval_secs": 0,
                "court_id": 12,
                "transition_timeout_secs": 30
            }"#,
        )
        .unwrap();

        assert_eq!(config.api_base_url, "https://courts.example.org");
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.court_id, Some(CourtId(12)));
        assert_eq!(config.transition_timeout, Duration::from_secs(30));
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(AppConfig::parse(r#"{"poll_interval_secs": "often"}"#).is_err());
    }
}
