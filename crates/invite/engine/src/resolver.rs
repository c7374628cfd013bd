//! Attribution Resolver.
//!
//! Infers which invite brought a member in by diffing the invite snapshot
//! fetched at join time against the one stored after the previous event.
//!
//! ## Tie-break policy
//!
//! Normally exactly one invite counter moves between two consecutive joins.
//! If several did (concurrent joins the platform batched, or a missed event),
//! the first candidate in the fetched snapshot's enumeration order wins and
//! the others are dropped. Nothing is summed and nothing errors. This keeps
//! attribution deterministic but can under-count an inviter whose join was
//! folded into another's diff.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use invite_types::{GuildId, InviteCode, InviteRecord, InviteSnapshot, MemberId};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::error::{EngineError, EngineResult};
use crate::platform::PlatformClient;
use crate::snapshot::SnapshotStore;

/// An invite whose use counter advanced between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Invite that advanced.
    pub code: InviteCode,

    /// Owner of the invite, if it has one.
    pub inviter: Option<MemberId>,

    /// Uses in the baseline snapshot.
    pub previous_uses: u64,

    /// Uses in the fresh snapshot.
    pub current_uses: u64,
}

impl Candidate {
    fn from_pair(old: &InviteRecord, new: &InviteRecord) -> Self {
        Self {
            code: new.code.clone(),
            inviter: new.inviter,
            previous_uses: old.uses,
            current_uses: new.uses,
        }
    }
}

/// Every invite of `new` whose counter is strictly higher than in `old`,
/// in `new`'s enumeration order.
///
/// Invites only present in `new` have no baseline and never qualify;
/// invites only present in `old` contribute nothing.
pub fn candidates(old: Option<&InviteSnapshot>, new: &InviteSnapshot) -> Vec<Candidate> {
    let Some(old) = old else {
        return Vec::new();
    };

    let baseline: HashMap<&InviteCode, &InviteRecord> =
        old.iter().map(|invite| (&invite.code, invite)).collect();

    new.iter()
        .filter_map(|fresh| {
            baseline
                .get(&fresh.code)
                .filter(|previous| fresh.uses > previous.uses)
                .map(|previous| Candidate::from_pair(previous, fresh))
        })
        .collect()
}

/// The single invite credited with a join, applying the first-candidate
/// tie-break.
pub fn diff(old: Option<&InviteSnapshot>, new: &InviteSnapshot) -> Option<Candidate> {
    candidates(old, new).into_iter().next()
}

/// Outcome of resolving one join event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Invite credited with the join.
    pub candidate: Option<Candidate>,

    /// Candidates dropped by the tie-break.
    pub competing: usize,

    /// Invites in the fetched snapshot.
    pub invite_count: usize,
}

impl Resolution {
    /// Inviter credited with the join, if any.
    pub fn inviter(&self) -> Option<MemberId> {
        self.candidate.as_ref().and_then(|c| c.inviter)
    }
}

/// Resolves join events against the platform and the snapshot store.
pub struct AttributionResolver {
    platform: Arc<dyn PlatformClient>,
    snapshots: Arc<SnapshotStore>,
    fetch_timeout: Duration,
}

impl AttributionResolver {
    pub fn new(
        platform: Arc<dyn PlatformClient>,
        snapshots: Arc<SnapshotStore>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            platform,
            snapshots,
            fetch_timeout,
        }
    }

    async fn fetch(&self, guild_id: GuildId) -> EngineResult<InviteSnapshot> {
        match tokio::time::timeout(self.fetch_timeout, self.platform.fetch_invites(guild_id)).await
        {
            Ok(Ok(invites)) => Ok(InviteSnapshot::new(invites)),
            Ok(Err(source)) => Err(EngineError::Fetch { guild_id, source }),
            Err(_) => Err(EngineError::FetchTimeout {
                guild_id,
                timeout_ms: self.fetch_timeout.as_millis() as u64,
            }),
        }
    }

    /// Store a fresh baseline for a guild.
    ///
    /// Returns the number of invites observed. On failure the previous
    /// baseline, if any, is kept.
    #[instrument(skip(self), fields(guild_id = %guild_id))]
    pub async fn seed(&self, guild_id: GuildId) -> EngineResult<usize> {
        let mut guard = self.snapshots.lock(guild_id).await;
        let fresh = self.fetch(guild_id).await?;
        let count = fresh.len();
        debug!(
            invites = count,
            total_uses = fresh.total_uses(),
            "Seeded invite snapshot"
        );
        guard.replace(fresh);

        Ok(count)
    }

    /// Work out which invite a join came through.
    ///
    /// Holds the guild's snapshot lock from fetch to replace, so concurrent
    /// joins in one guild each diff against their predecessor's snapshot.
    /// The fresh snapshot becomes the new baseline whether or not a
    /// candidate was found. A failed fetch leaves the baseline untouched.
    #[instrument(skip(self), fields(guild_id = %guild_id))]
    pub async fn resolve(&self, guild_id: GuildId) -> EngineResult<Resolution> {
        let mut guard = self.snapshots.lock(guild_id).await;
        let fresh = self.fetch(guild_id).await?;

        let mut found = candidates(guard.baseline(), &fresh).into_iter();
        let candidate = found.next();
        let competing = found.count();

        if competing > 0 {
            warn!(
                competing,
                chosen = ?candidate.as_ref().map(|c| &c.code),
                "Several invites advanced in one join, crediting the first"
            );
        }

        let resolution = Resolution {
            candidate,
            competing,
            invite_count: fresh.len(),
        };
        guard.replace(fresh);

        Ok(resolution)
    }
}
