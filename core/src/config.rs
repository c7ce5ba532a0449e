use std::env;
use std::path::PathBuf;

use tracing::{info, warn};

/// Environment variable selecting the backend host.
pub const BASE_URL_VAR: &str = "FEEDBACK_API_URL";
/// Environment variable selecting where the session file is kept.
pub const STORAGE_DIR_VAR: &str = "FEEDBACK_STORAGE_DIR";

pub const DEFAULT_API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub api_prefix: String,
    pub storage_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            storage_dir: None,
        }
    }

    /// Loads the configuration from the process environment.
    ///
    /// A missing base URL is not fatal: every request is then sent to a
    /// relative path and fails at the transport.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup(BASE_URL_VAR)
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| {
                warn!("{BASE_URL_VAR} is not set; API requests will fail");
                String::new()
            });
        let storage_dir = lookup(STORAGE_DIR_VAR).map(PathBuf::from);
        if storage_dir.is_none() {
            info!("{STORAGE_DIR_VAR} not set, session will not outlive the process");
        }

        Self {
            storage_dir,
            ..Self::new(base_url.trim())
        }
    }

    pub fn with_api_prefix(mut self, prefix: &str) -> Self {
        self.api_prefix = prefix.to_string();
        self
    }

    /// Full URL for an API path such as `/auth/me`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_prefix_and_path() {
        let config = ClientConfig::new("https://api.example.com/");
        assert_eq!(
            config.url_for("/auth/me"),
            "https://api.example.com/api/v1/auth/me"
        );
    }

    #[test]
    fn missing_base_url_yields_relative_urls() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config.base_url, "");
        assert_eq!(config.url_for("/dashboard"), "/api/v1/dashboard");
        assert!(config.storage_dir.is_none());
    }

    #[test]
    fn reads_both_variables() {
        let config = ClientConfig::from_lookup(|key| match key {
            BASE_URL_VAR => Some("http://localhost:4000".to_string()),
            STORAGE_DIR_VAR => Some("/tmp/feedback".to_string()),
            _ => None,
        });
        assert_eq!(config.base_url, "http://localhost:4000");
        assert_eq!(config.storage_dir, Some(PathBuf::from("/tmp/feedback")));
    }

    #[test]
    fn custom_prefix() {
        let config = ClientConfig::new("http://h").with_api_prefix("/v2");
        assert_eq!(config.url_for("/plans"), "http://h/v2/plans");
    }
}
