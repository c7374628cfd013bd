//! Reward grant intents.

use serde::{Deserialize, Serialize};

use crate::ids::{GuildId, MemberId, RewardId};

/// Request to grant a reward, emitted when an inviter reaches the goal.
///
/// The engine emits an intent once per crossing. Performing the grant and
/// handling its failure belong to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantIntent {
    /// Guild the referral happened in.
    pub guild_id: GuildId,

    /// Inviter who earned the reward.
    pub member_id: MemberId,

    /// Reward configured for the guild at the time of the crossing.
    pub reward_id: RewardId,

    /// Referral count that reached the goal.
    pub count: u64,
}

impl std::fmt::Display for GrantIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "grant {} to {} in {} at {} referrals",
            self.reward_id, self.member_id, self.guild_id, self.count
        )
    }
}
