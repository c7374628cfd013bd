//! Configuration for invite-replay

use invite_engine::EngineConfig;
use serde::{Deserialize, Serialize};

use crate::error::ReplayResult;

/// Replay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Engine configuration
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ReplayConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `INVITE__`-prefixed environment variables
    /// (e.g. `INVITE__ENGINE__INVITE_GOAL=5`).
    pub fn load(path: Option<&str>) -> ReplayResult<Self> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&ReplayConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("INVITE")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: ReplayConfig = builder.build()?.try_deserialize()?;
        config.engine.validate()?;
        Ok(config)
    }
}
