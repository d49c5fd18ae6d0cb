//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! Each section converts into the parameter type of the layer that uses it.

mod discovery;
mod logging;
mod mcq;
mod write_safety;

pub use discovery::FileDiscoveryConfig;
pub use logging::FileLoggingConfig;
pub use mcq::FileMcqConfig;
pub use write_safety::FileWriteSafetyConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    #[error("{field} cannot be 0")]
    ZeroValue { field: &'static str },

    #[error("discovery.server_url cannot be empty")]
    EmptyServerUrl,

    #[error(
        "discovery.sse_poll_timeout_secs ({poll}) must be shorter than discovery.sse_timeout_secs ({overall})"
    )]
    PollNotShorter { poll: u64, overall: u64 },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Tool server and transport timeouts
    pub discovery: FileDiscoveryConfig,
    /// Pre-requisite chain limits and confirmation policy
    pub write_safety: FileWriteSafetyConfig,
    /// Question lifetime and chaining
    pub mcq: FileMcqConfig,
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the configuration, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.discovery.server_url.trim().is_empty() {
            return Err(ConfigValidationError::EmptyServerUrl);
        }

        let non_zero = [
            ("discovery.request_timeout_secs", self.discovery.request_timeout_secs),
            ("discovery.streamable_timeout_secs", self.discovery.streamable_timeout_secs),
            ("discovery.sse_timeout_secs", self.discovery.sse_timeout_secs),
            ("discovery.sse_poll_timeout_secs", self.discovery.sse_poll_timeout_secs),
            ("discovery.max_tool_pages", self.discovery.max_tool_pages as u64),
            ("write_safety.chain_timeout_secs", self.write_safety.chain_timeout_secs),
            ("write_safety.max_chain_depth", self.write_safety.max_chain_depth as u64),
            ("write_safety.mcq_preview_limit", self.write_safety.mcq_preview_limit as u64),
            ("mcq.ttl_minutes", self.mcq.ttl_minutes),
        ];
        if let Some((field, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigValidationError::ZeroValue { field });
        }

        if self.discovery.sse_poll_timeout_secs >= self.discovery.sse_timeout_secs {
            return Err(ConfigValidationError::PollNotShorter {
                poll: self.discovery.sse_poll_timeout_secs,
                overall: self.discovery.sse_timeout_secs,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[discovery]
server_url = "https://tools.example.com/mcp"
request_timeout_secs = 5
streamable_timeout_secs = 12
sse_timeout_secs = 20
max_tool_pages = 8
sse_poll_timeout_secs = 3

[write_safety]
max_chain_depth = 3
chain_timeout_secs = 15
mcq_preview_limit = 4
confirm_destructive = false

[mcq]
ttl_minutes = 10
max_chained = 1

[logging]
step_log = "/tmp/steps.jsonl"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());

        let negotiator = config.discovery.to_negotiator_config();
        assert_eq!(negotiator.request_timeout, Duration::from_secs(5));
        assert_eq!(negotiator.streamable_timeout, Duration::from_secs(12));
        assert_eq!(negotiator.max_tool_pages, 8);
        assert_eq!(negotiator.resolved_sse_url(), "https://tools.example.com/sse");

        let params = config.write_safety.to_params();
        assert_eq!(params.max_chain_depth, 3);
        assert_eq!(params.preview_limit, 4);
        assert!(!params.confirm_destructive);

        let mcq = config.mcq.to_params();
        assert_eq!(mcq.ttl, Duration::from_secs(600));
        assert_eq!(mcq.max_chained, 1);

        assert_eq!(
            config.logging.step_log_path().unwrap().to_string_lossy(),
            "/tmp/steps.jsonl"
        );
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: FileConfig = toml::from_str("[mcq]\nmax_chained = 4\n").unwrap();
        assert_eq!(config.mcq.max_chained, 4);
        assert_eq!(config.mcq.ttl_minutes, 30);
        assert_eq!(config.write_safety, FileWriteSafetyConfig::default());
        assert!(config.logging.step_log_path().is_none());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = FileConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.discovery.sse_timeout_secs, 25);
        assert_eq!(config.write_safety.max_chain_depth, 5);
        assert!(config.write_safety.confirm_destructive);
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = FileConfig::default();
        config.write_safety.chain_timeout_secs = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::ZeroValue {
                field: "write_safety.chain_timeout_secs"
            })
        );
    }

    #[test]
    fn test_validate_zero_page_cap() {
        let mut config = FileConfig::default();
        config.discovery.max_tool_pages = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigValidationError::ZeroValue {
                field: "discovery.max_tool_pages"
            })
        );
    }

    #[test]
    fn test_validate_poll_must_be_shorter() {
        let mut config = FileConfig::default();
        config.discovery.sse_poll_timeout_secs = 25;
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::PollNotShorter { poll: 25, overall: 25 })
        ));
    }
}
