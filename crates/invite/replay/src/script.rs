//! Replay script format.
//!
//! A script declares the guilds of an in-memory platform and a list of steps
//! to play against the engine:
//!
//! ```json
//! {
//!   "guilds": [
//!     { "id": 1, "invites": [{ "code": "z", "uses": 0, "inviter": 100 }] }
//!   ],
//!   "steps": [
//!     { "action": "set_reward", "guild": 1, "reward": 900 },
//!     { "action": "startup" },
//!     { "action": "join", "guild": 1, "member": 1, "via": "z", "repeat": 20 }
//!   ]
//! }
//! ```

use std::path::Path;

use invite_types::{GuildId, InviteCode, InviteRecord, MemberId, RewardId};
use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, ReplayResult};

/// A full replay script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Guilds present on the platform before the first step.
    #[serde(default)]
    pub guilds: Vec<GuildSetup>,

    /// Steps, played in order.
    pub steps: Vec<Step>,
}

/// Initial platform state of one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSetup {
    pub id: GuildId,

    #[serde(default)]
    pub invites: Vec<InviteRecord>,

    /// Rewards that exist in the guild. When absent, any reward can be granted.
    #[serde(default)]
    pub rewards: Option<Vec<RewardId>>,
}

/// One scripted step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Seed snapshots. Defaults to every declared guild.
    Startup {
        #[serde(default)]
        guilds: Option<Vec<GuildId>>,
    },

    /// Configure the reward of a guild.
    SetReward { guild: GuildId, reward: RewardId },

    /// Add an invite on the platform.
    CreateInvite {
        guild: GuildId,
        code: InviteCode,
        #[serde(default)]
        inviter: Option<MemberId>,
        #[serde(default)]
        uses: u64,
    },

    /// Remove an invite from the platform.
    DeleteInvite { guild: GuildId, code: InviteCode },

    /// A member joins, optionally through an invite. With `repeat`, members
    /// `member`, `member + 1`, ... join one after another.
    Join {
        guild: GuildId,
        member: MemberId,
        #[serde(default)]
        via: Option<InviteCode>,
        #[serde(default = "default_repeat")]
        repeat: u64,
    },

    /// Invite listing fails with a permission error.
    DenyFetch { guild: GuildId },

    /// Invite listing works again.
    AllowFetch { guild: GuildId },

    /// Grants fail with the given kind of error.
    DenyGrants { guild: GuildId, kind: GrantDenial },

    /// Grants work again.
    AllowGrants { guild: GuildId },

    /// Hand the configured reward to a member directly.
    GrantManual { guild: GuildId, member: MemberId },
}

fn default_repeat() -> u64 {
    1
}

/// Kind of grant failure to inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantDenial {
    Permission,
    Hierarchy,
    Unavailable,
}

impl Script {
    /// Parse a script from JSON text.
    pub fn from_json(text: &str) -> ReplayResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a script file.
    pub fn load(path: &Path) -> ReplayResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ReplayError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn guild_ids(&self) -> Vec<GuildId> {
        self.guilds.iter().map(|guild| guild.id).collect()
    }
}
