//! services/client/src/config.rs
//!
//! Defines the client's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_CREDENTIALS_PATH: &str = "./.family-tree/credentials.json";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base address of the remote genealogy API, without a trailing slash.
    pub api_base_url: String,
    pub credentials_path: PathBuf,
    pub log_level: Level,
    /// `None` means requests never time out.
    pub request_timeout: Option<Duration>,
}

impl Config {
    /// Builds a configuration for the given API address with default settings otherwise.
    pub fn new(api_base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base_url: normalize_base_url("API_BASE_URL", api_base_url)?,
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS_PATH),
            log_level: Level::INFO,
            request_timeout: None,
        })
    }

    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let api_base_url_str = std::env::var("API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let api_base_url = normalize_base_url("API_BASE_URL", &api_base_url_str)?;

        let credentials_path = std::env::var("CREDENTIALS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CREDENTIALS_PATH));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let request_timeout = match std::env::var("REQUEST_TIMEOUT_SECS") {
            Ok(raw) => Some(parse_timeout(&raw)?),
            Err(_) => None,
        };

        Ok(Self {
            api_base_url,
            credentials_path,
            log_level,
            request_timeout,
        })
    }

    /// Overrides the credentials file location.
    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }
}

fn normalize_base_url(var: &str, raw: &str) -> Result<String, ConfigError> {
    let url = reqwest::Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue(
            var.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue(
            "REQUEST_TIMEOUT_SECS".to_string(),
            format!("'{}' is not a positive number of seconds", raw),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_stripped() {
        let config = Config::new("http://api.example.test:8000/").unwrap();
        assert_eq!(config.api_base_url, "http://api.example.test:8000");
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn test_rejects_non_http_urls() {
        assert!(matches!(
            Config::new("ftp://example.test"),
            Err(ConfigError::InvalidValue(var, _)) if var == "API_BASE_URL"
        ));
        assert!(Config::new("not a url").is_err());
    }

    #[test]
    fn test_timeout_must_be_positive() {
        assert_eq!(parse_timeout("30").unwrap(), Duration::from_secs(30));
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn test_credentials_path_override() {
        let config = Config::new("http://localhost:8000")
            .unwrap()
            .with_credentials_path("/tmp/creds.json");
        assert_eq!(config.credentials_path, PathBuf::from("/tmp/creds.json"));
    }
}
