//! Structured results returned to the engine's caller.
//!
//! Every failure inside one event ends up here instead of as an `Err`, so a
//! bad fetch or grant in one guild never unwinds into another.

use invite_types::{GrantIntent, GuildId, InviteCode, MemberId};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, PlatformError};

/// How a join event ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JoinStatus {
    /// Credited to an inviter.
    Attributed,

    /// No owned invite advanced. Direct joins, vanity links and
    /// diffs lost to a race all end here; it is not an error.
    Unattributed,

    /// The engine may not list invites in this guild.
    FetchPermissionDenied { reason: String },

    /// Listing invites failed for another reason, including timeouts.
    FetchFailed { reason: String },
}

impl JoinStatus {
    pub(crate) fn from_fetch_error(error: &EngineError) -> Self {
        match error {
            EngineError::Fetch {
                source: PlatformError::PermissionDenied(reason),
                ..
            } => JoinStatus::FetchPermissionDenied {
                reason: reason.clone(),
            },
            other => JoinStatus::FetchFailed {
                reason: other.to_string(),
            },
        }
    }
}

/// Result of one member join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionResult {
    pub guild_id: GuildId,

    /// Member who joined.
    pub member_id: MemberId,

    /// Inviter credited with the join.
    pub inviter: Option<MemberId>,

    /// Invite that advanced, even when it had no inviter.
    pub invite_code: Option<InviteCode>,

    /// Inviter's referral count after this join.
    pub new_count: Option<u64>,

    /// Set when this join took the inviter to the goal.
    pub grant_intent: Option<GrantIntent>,

    pub status: JoinStatus,
}

impl AttributionResult {
    pub(crate) fn unresolved(guild_id: GuildId, member_id: MemberId, status: JoinStatus) -> Self {
        Self {
            guild_id,
            member_id,
            inviter: None,
            invite_code: None,
            new_count: None,
            grant_intent: None,
            status,
        }
    }

    pub fn is_attributed(&self) -> bool {
        self.status == JoinStatus::Attributed
    }
}

/// Result of handing out a reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum GrantOutcome {
    /// The member now holds the reward.
    Granted,

    /// The member already held the reward; nothing was changed.
    AlreadyHeld,

    /// The guild has no reward configured.
    NoRewardConfigured,

    /// The configured reward no longer exists on the platform.
    RewardMissing,

    /// The engine lacks the permission to grant roles.
    PermissionDenied(String),

    /// The reward ranks above the engine's own role.
    HierarchyError,

    /// Any other platform failure.
    Failed(String),
}

impl GrantOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, GrantOutcome::Granted)
    }
}

impl From<PlatformError> for GrantOutcome {
    fn from(error: PlatformError) -> Self {
        match error {
            PlatformError::PermissionDenied(reason) => GrantOutcome::PermissionDenied(reason),
            PlatformError::Hierarchy(_) => GrantOutcome::HierarchyError,
            PlatformError::RewardNotFound(_) => GrantOutcome::RewardMissing,
            PlatformError::Unavailable(reason) => GrantOutcome::Failed(reason),
        }
    }
}

/// Result of seeding snapshots at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartupReport {
    /// Guilds whose baseline was stored.
    pub seeded: Vec<GuildId>,

    /// Guilds that could not be seeded, with the reason.
    pub failed: Vec<(GuildId, String)>,
}

impl StartupReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invite_types::RewardId;

    #[test]
    fn test_permission_denied_fetch_is_classified() {
        let error = EngineError::Fetch {
            guild_id: GuildId::new(1),
            source: PlatformError::PermissionDenied("manage_guild".into()),
        };
        assert_eq!(
            JoinStatus::from_fetch_error(&error),
            JoinStatus::FetchPermissionDenied {
                reason: "manage_guild".into()
            }
        );

        let timeout = EngineError::FetchTimeout {
            guild_id: GuildId::new(1),
            timeout_ms: 10,
        };
        assert!(matches!(
            JoinStatus::from_fetch_error(&timeout),
            JoinStatus::FetchFailed { .. }
        ));
    }

    #[test]
    fn test_grant_outcome_from_platform_error() {
        assert_eq!(
            GrantOutcome::from(PlatformError::Hierarchy(RewardId::new(1))),
            GrantOutcome::HierarchyError
        );
        assert_eq!(
            GrantOutcome::from(PlatformError::RewardNotFound(RewardId::new(1))),
            GrantOutcome::RewardMissing
        );
        assert!(!GrantOutcome::AlreadyHeld.is_granted());
    }

    #[test]
    fn test_result_serializes_status_tag() {
        let result = AttributionResult::unresolved(
            GuildId::new(1),
            MemberId::new(2),
            JoinStatus::Unattributed,
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"]["status"], "unattributed");
        assert!(json["inviter"].is_null());
    }
}
