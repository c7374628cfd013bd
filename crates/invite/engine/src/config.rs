//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// Configuration for the attribution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Referral count at which the guild's reward is granted.
    #[serde(default = "default_invite_goal")]
    pub invite_goal: u64,

    /// Upper bound on a single invite listing, in milliseconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,

    /// Capacity of the engine event channel.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            invite_goal: default_invite_goal(),
            fetch_timeout_ms: default_fetch_timeout(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl EngineConfig {
    /// Default configuration with a different goal.
    pub fn with_goal(invite_goal: u64) -> Self {
        Self {
            invite_goal,
            ..Default::default()
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> EngineResult<()> {
        if self.invite_goal == 0 {
            // counts start at 1, a goal of 0 could never be reached
            return Err(EngineError::Configuration(
                "invite_goal must be at least 1".to_string(),
            ));
        }
        if self.fetch_timeout_ms == 0 {
            return Err(EngineError::Configuration(
                "fetch_timeout_ms must be positive".to_string(),
            ));
        }
        if self.event_buffer == 0 {
            return Err(EngineError::Configuration(
                "event_buffer must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// Default value helpers
fn default_invite_goal() -> u64 {
    20
}

fn default_fetch_timeout() -> u64 {
    10_000
}

fn default_event_buffer() -> usize {
    1024
}
