//! Invite records and point-in-time snapshots.
//!
//! The platform owns invite lifecycles; the engine only ever sees snapshots of
//! them. A snapshot keeps the platform's enumeration order, which is the order
//! attribution uses to break ties.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{InviteCode, MemberId};

/// One invite link as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteRecord {
    /// Invite token.
    pub code: InviteCode,

    /// Cumulative number of joins through this invite.
    pub uses: u64,

    /// Member who created the invite. Vanity and widget invites have none.
    #[serde(default)]
    pub inviter: Option<MemberId>,
}

impl InviteRecord {
    pub fn new(code: impl Into<InviteCode>, uses: u64, inviter: Option<MemberId>) -> Self {
        Self {
            code: code.into(),
            uses,
            inviter,
        }
    }

    /// An invite created by `inviter`.
    pub fn owned_by(code: impl Into<InviteCode>, uses: u64, inviter: MemberId) -> Self {
        Self::new(code, uses, Some(inviter))
    }
}

/// All invites of one guild at one moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InviteSnapshot {
    /// Invites in platform enumeration order.
    pub invites: Vec<InviteRecord>,

    /// When the snapshot was fetched.
    pub captured_at: DateTime<Utc>,
}

impl InviteSnapshot {
    /// Capture a snapshot now.
    pub fn new(invites: Vec<InviteRecord>) -> Self {
        Self {
            invites,
            captured_at: Utc::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Find an invite by code.
    pub fn get(&self, code: &InviteCode) -> Option<&InviteRecord> {
        self.invites.iter().find(|invite| &invite.code == code)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InviteRecord> {
        self.invites.iter()
    }

    pub fn len(&self) -> usize {
        self.invites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invites.is_empty()
    }

    /// Total uses across all invites.
    pub fn total_uses(&self) -> u64 {
        self.invites.iter().map(|invite| invite.uses).sum()
    }
}

impl Default for InviteSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for InviteSnapshot {
    /// Snapshots are equal when they hold the same invites; capture time is ignored.
    fn eq(&self, other: &Self) -> bool {
        self.invites == other.invites
    }
}

impl Eq for InviteSnapshot {}
