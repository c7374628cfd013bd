//! Error types for invite-replay

use std::path::PathBuf;

use invite_engine::EngineError;
use thiserror::Error;

/// Errors raised while preparing or running a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid script: {0}")]
    Script(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Result type for replay operations.
pub type ReplayResult<T> = Result<T, ReplayError>;
