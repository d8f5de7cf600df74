use serde::{Deserialize, Serialize};

use super::ConfigError;

/// External metric source configuration.
///
/// Points at the public TikTok web frontend by default. The base URL is
/// overridable so tests can target a local mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Base URL of the profile pages.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Default request timeout in seconds. Callers may tighten this
    /// per operation but never extend it.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent presented to the upstream. Profile pages only embed
    /// the account data payload for browser-like clients.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl SourceConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::Validation(
                "source base_url cannot be empty".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "source timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://www.tiktok.com".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}
