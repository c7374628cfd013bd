//! Events emitted by the invite engine.
//!
//! Subscribers (notification, audit, metrics) receive these through
//! [`InviteEngine::subscribe`](crate::InviteEngine::subscribe). The engine
//! never waits on them and works the same with no subscriber at all.

use invite_types::{GrantIntent, GuildId, InviteCode, MemberId, RewardId};
use serde::{Deserialize, Serialize};

/// Engine event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A guild's baseline snapshot was stored at startup.
    Seeded { guild_id: GuildId, invites: usize },

    /// A guild could not be seeded.
    SeedFailed { guild_id: GuildId, reason: String },

    /// A join was credited to an inviter.
    Attributed {
        guild_id: GuildId,
        member_id: MemberId,
        inviter: MemberId,
        code: InviteCode,
        count: u64,
    },

    /// A join could not be traced to an owned invite.
    Unattributed {
        guild_id: GuildId,
        member_id: MemberId,
        code: Option<InviteCode>,
    },

    /// Invites could not be listed for a join.
    FetchFailed {
        guild_id: GuildId,
        member_id: MemberId,
        reason: String,
    },

    /// A guild's reward was set.
    RewardConfigured {
        guild_id: GuildId,
        reward_id: RewardId,
        previous: Option<RewardId>,
    },

    /// An inviter reached the goal.
    GrantIntentIssued(GrantIntent),

    /// A reward was handed out.
    RewardGranted {
        guild_id: GuildId,
        member_id: MemberId,
        reward_id: RewardId,
    },

    /// A reward could not be handed out.
    GrantFailed {
        guild_id: GuildId,
        member_id: MemberId,
        reward_id: RewardId,
        reason: String,
    },
}

impl EngineEvent {
    /// Guild the event belongs to.
    pub fn guild_id(&self) -> GuildId {
        match self {
            EngineEvent::Seeded { guild_id, .. }
            | EngineEvent::SeedFailed { guild_id, .. }
            | EngineEvent::Attributed { guild_id, .. }
            | EngineEvent::Unattributed { guild_id, .. }
            | EngineEvent::FetchFailed { guild_id, .. }
            | EngineEvent::RewardConfigured { guild_id, .. }
            | EngineEvent::RewardGranted { guild_id, .. }
            | EngineEvent::GrantFailed { guild_id, .. } => *guild_id,
            EngineEvent::GrantIntentIssued(intent) => intent.guild_id,
        }
    }
}
