//! Reward Trigger.
//!
//! Fires a [`GrantIntent`] on the exact event where an inviter's count equals
//! the goal. Counts only climb, so equality fires once per inviter without an
//! "already rewarded" flag. A count reset below the goal by something outside
//! the engine would let it fire again on the way back up.

use std::sync::Arc;

use invite_types::{GrantIntent, GuildId, MemberId};

use crate::reward_config::RewardConfigStore;

/// Decides whether a new referral count earns the guild's reward.
pub struct RewardTrigger {
    goal: u64,
    rewards: Arc<RewardConfigStore>,
}

impl RewardTrigger {
    pub fn new(goal: u64, rewards: Arc<RewardConfigStore>) -> Self {
        Self { goal, rewards }
    }

    pub fn goal(&self) -> u64 {
        self.goal
    }

    /// Evaluate a count just produced by an increment.
    ///
    /// Returns an intent only when `count == goal` and the guild has a
    /// reward configured.
    pub fn evaluate(&self, guild_id: GuildId, inviter: MemberId, count: u64) -> Option<GrantIntent> {
        if count != self.goal {
            return None;
        }

        let reward_id = self.rewards.get(guild_id)?;
        Some(GrantIntent {
            guild_id,
            member_id: inviter,
            reward_id,
            count,
        })
    }
}
