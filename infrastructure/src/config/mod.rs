//! Configuration file loading for toolgate
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `--config <path>` specified file
//! 2. Project root: `./toolgate.toml` or `./.toolgate.toml`
//! 3. XDG config: `$XDG_CONFIG_HOME/toolgate/config.toml`
//! 4. `TOOLGATE_`-prefixed environment variables, nested with `__`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileDiscoveryConfig, FileLoggingConfig, FileMcqConfig,
    FileWriteSafetyConfig,
};
pub use loader::ConfigLoader;
