//! Reward configuration store.
//!
//! Maps each guild to the reward granted when an inviter reaches the goal.
//! Whether the reward can actually be granted is only known at grant time.

use dashmap::DashMap;
use invite_types::{GuildId, RewardId};

/// Per-guild reward configuration. At most one reward per guild.
#[derive(Debug, Default)]
pub struct RewardConfigStore {
    rewards: DashMap<GuildId, RewardId>,
}

impl RewardConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a guild's reward, returning the one it replaced.
    pub fn set(&self, guild_id: GuildId, reward_id: RewardId) -> Option<RewardId> {
        self.rewards.insert(guild_id, reward_id)
    }

    pub fn get(&self, guild_id: GuildId) -> Option<RewardId> {
        self.rewards.get(&guild_id).map(|reward| *reward)
    }

    /// Number of guilds with a reward configured.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}
