//! CLI configuration loading

use std::path::Path;

use integration_emt::EmtConfig;
use serde::Deserialize;

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_NAME: &str = "emt";

/// Prefix of environment variable overrides (e.g. `EMT_API__CLIENT_ID`)
pub const ENV_PREFIX: &str = "EMT";

/// Top-level CLI configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// EMT open API settings
    #[serde(default)]
    pub api: EmtConfig,
}

impl AppConfig {
    /// Load configuration from an optional file and the environment
    ///
    /// With no `path`, `emt.toml` in the working directory is read if present.
    /// Environment variables override file values, using `__` to descend into
    /// sections: `EMT_API__CLIENT_ID`, `EMT_API__PASS_KEY`.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let builder = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }
}
