//! Configuration module for the fleet service.
//!
//! The service is configured via a TOML file, with support for
//! environment variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [database]
//! path = "/var/lib/tokfleet/fleet.db"
//!
//! [source]
//! base_url = "https://www.tiktok.com"
//! timeout_secs = 15
//!
//! [observability.logging]
//! level = "info"
//! format = "pretty"
//! ```

mod database;
mod observability;
mod source;

use std::path::Path;

pub use database::*;
pub use observability::*;
use serde::{Deserialize, Serialize};
pub use source::*;

/// Root configuration for the fleet service.
///
/// All sections are optional with sensible defaults, allowing minimal
/// configuration for development deployments.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FleetConfig {
    /// Database configuration for persistent storage.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// External metric source configuration.
    #[serde(default)]
    pub source: SourceConfig,

    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Dashboard aggregation tuning.
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

impl FleetConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: FleetConfig = toml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.source.validate()?;
        self.dashboard.validate()?;
        Ok(())
    }
}

/// Dashboard aggregation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    /// Number of accounts in the top-followers ranking.
    #[serde(default = "default_top_accounts")]
    pub top_accounts: usize,

    /// Days between the snapshots compared for the per-group growth rate.
    #[serde(default = "default_growth_window_days")]
    pub growth_window_days: i64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            top_accounts: default_top_accounts(),
            growth_window_days: default_growth_window_days(),
        }
    }
}

impl DashboardConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.growth_window_days <= 0 {
            return Err(ConfigError::Validation(
                "dashboard.growth_window_days must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn default_top_accounts() -> usize {
    5
}

fn default_growth_window_days() -> i64 {
    7
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand `${VAR_NAME}` references from the process environment.
///
/// References appearing after a `#` comment marker are left untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let match_start = cap.get(0).unwrap().start();

            if let Some(pos) = comment_pos
                && match_start >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..match_start]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = cap.get(0).unwrap().end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    if !input.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_from_empty_config() {
        let config = FleetConfig::from_toml("").expect("empty config should parse");
        assert_eq!(config.dashboard.top_accounts, 5);
        assert_eq!(config.dashboard.growth_window_days, 7);
        assert_eq!(config.source.timeout_secs, 15);
    }

    #[test]
    fn env_vars_are_expanded() {
        // The variable name is unique to this test to avoid clashing
        // with sibling tests sharing the process environment.
        unsafe { std::env::set_var("TOKFLEET_TEST_DB_PATH", "/tmp/fleet-test.db") };
        let config =
            FleetConfig::from_toml("[database]\npath = \"${TOKFLEET_TEST_DB_PATH}\"\n")
                .expect("config should parse");
        assert_eq!(config.database.path, "/tmp/fleet-test.db");
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let err = FleetConfig::from_toml("[database]\npath = \"${TOKFLEET_NO_SUCH_VAR}\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound(_)));
    }

    #[test]
    fn env_vars_in_comments_are_ignored() {
        let config = FleetConfig::from_toml(
            "[database]\npath = \"fleet.db\" # set from ${SOME_VAR} in prod\n",
        )
        .expect("config should parse");
        assert_eq!(config.database.path, "fleet.db");
    }

    #[test]
    fn invalid_growth_window_is_rejected() {
        let err = FleetConfig::from_toml("[dashboard]\ngrowth_window_days = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
