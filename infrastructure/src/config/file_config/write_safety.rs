//! Write-safety configuration from TOML (`[write_safety]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolgate_application::WriteSafetyParams;

/// Raw write-safety configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWriteSafetyConfig {
    /// Steps per pre-requisite chain (clamped to the hard cap)
    pub max_chain_depth: usize,
    /// Overall deadline for one chain
    pub chain_timeout_secs: u64,
    /// Options offered in an entity-selection question
    pub mcq_preview_limit: usize,
    /// Ask for a Yes/No confirmation before destructive writes
    pub confirm_destructive: bool,
}

impl Default for FileWriteSafetyConfig {
    fn default() -> Self {
        let defaults = WriteSafetyParams::default();
        Self {
            max_chain_depth: defaults.max_chain_depth,
            chain_timeout_secs: defaults.chain_timeout.as_secs(),
            mcq_preview_limit: defaults.preview_limit,
            confirm_destructive: defaults.confirm_destructive,
        }
    }
}

impl FileWriteSafetyConfig {
    pub fn to_params(&self) -> WriteSafetyParams {
        WriteSafetyParams::default()
            .with_max_chain_depth(self.max_chain_depth)
            .with_chain_timeout(Duration::from_secs(self.chain_timeout_secs))
            .with_preview_limit(self.mcq_preview_limit)
            .with_confirm_destructive(self.confirm_destructive)
    }
}
