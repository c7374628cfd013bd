//! Invite Snapshot Store.
//!
//! Holds the last invite snapshot seen for each guild. Every guild owns its
//! own async mutex so that the fetch, diff and replace sequence of one join
//! event is serialized per guild while other guilds proceed in parallel.

use std::sync::Arc;

use dashmap::DashMap;
use invite_types::{GuildId, InviteSnapshot};
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slot = Arc<Mutex<Option<InviteSnapshot>>>;

/// Per-guild store of the most recent invite snapshot.
#[derive(Default)]
pub struct SnapshotStore {
    slots: DashMap<GuildId, Slot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, guild_id: GuildId) -> Slot {
        // The map guard must not be held across an await.
        self.slots.entry(guild_id).or_default().clone()
    }

    /// Current snapshot of a guild. `None` means nothing observed yet,
    /// which callers treat as an empty invite list.
    pub async fn get(&self, guild_id: GuildId) -> Option<InviteSnapshot> {
        let slot = self.slots.get(&guild_id).map(|slot| slot.clone())?;
        let guard = slot.lock().await;
        guard.clone()
    }

    /// Replace a guild's snapshot.
    pub async fn set(&self, guild_id: GuildId, snapshot: InviteSnapshot) {
        let mut guard = self.lock(guild_id).await;
        guard.replace(snapshot);
    }

    /// Take exclusive access to a guild's snapshot.
    ///
    /// Held for the whole read-and-replace of one join event.
    pub async fn lock(&self, guild_id: GuildId) -> SnapshotGuard {
        let inner = self.slot(guild_id).lock_owned().await;
        SnapshotGuard { inner }
    }

    /// Number of guilds the store has a slot for, including guilds whose
    /// first fetch is still in flight or failed.
    pub fn tracked_guilds(&self) -> usize {
        self.slots.len()
    }
}

/// Exclusive handle on one guild's snapshot.
pub struct SnapshotGuard {
    inner: OwnedMutexGuard<Option<InviteSnapshot>>,
}

impl SnapshotGuard {
    /// The baseline to diff against, if one was ever stored.
    pub fn baseline(&self) -> Option<&InviteSnapshot> {
        self.inner.as_ref()
    }

    /// Replace the baseline. The previous snapshot is discarded.
    pub fn replace(&mut self, snapshot: InviteSnapshot) {
        *self.inner = Some(snapshot);
    }
}
