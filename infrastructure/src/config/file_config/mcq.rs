//! MCQ configuration from TOML (`[mcq]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolgate_application::McqParams;

/// Raw MCQ configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMcqConfig {
    /// Minutes before an unanswered question expires
    pub ttl_minutes: u64,
    /// Answered questions per flow before consolidating
    pub max_chained: u32,
}

impl Default for FileMcqConfig {
    fn default() -> Self {
        let defaults = McqParams::default();
        Self {
            ttl_minutes: defaults.ttl.as_secs() / 60,
            max_chained: defaults.max_chained,
        }
    }
}

impl FileMcqConfig {
    pub fn to_params(&self) -> McqParams {
        McqParams::default()
            .with_ttl(Duration::from_secs(self.ttl_minutes * 60))
            .with_max_chained(self.max_chained)
    }
}
