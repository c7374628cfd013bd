//! Error types for invite-engine crate.
//!
//! Platform failures are what collaborators report; engine errors wrap them
//! with the guild they occurred in. Neither crosses an event boundary: the
//! engine facade folds both into structured results.

use invite_types::{GuildId, RewardId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures reported by the platform client.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum PlatformError {
    /// The engine lacks the capability needed for the call.
    #[error("missing permission: {0}")]
    PermissionDenied(String),

    /// The reward sits above the engine's own rank.
    #[error("role hierarchy prevents granting {0}")]
    Hierarchy(RewardId),

    /// The configured reward no longer exists on the platform.
    #[error("reward not found: {0}")]
    RewardNotFound(RewardId),

    /// Transport or upstream failure.
    #[error("platform unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised inside the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Listing invites failed.
    #[error("failed to fetch invites for {guild_id}: {source}")]
    Fetch {
        guild_id: GuildId,
        #[source]
        source: PlatformError,
    },

    /// Listing invites did not answer in time.
    #[error("timed out fetching invites for {guild_id} after {timeout_ms}ms")]
    FetchTimeout { guild_id: GuildId, timeout_ms: u64 },

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
