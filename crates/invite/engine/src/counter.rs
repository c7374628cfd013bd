//! Referral Counter.
//!
//! Counts successful attributions per inviter and guild. Counts only go up;
//! the engine never decrements or resets them.

use std::collections::BTreeMap;

use dashmap::DashMap;
use invite_types::{GuildId, MemberId};

/// Per-guild, per-inviter referral counts.
#[derive(Debug, Default)]
pub struct ReferralCounter {
    counts: DashMap<(GuildId, MemberId), u64>,
}

impl ReferralCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one referral and return the new count.
    ///
    /// The read-modify-write happens under the entry's shard lock, so
    /// concurrent increments of the same key never lose an update.
    pub fn increment(&self, guild_id: GuildId, inviter: MemberId) -> u64 {
        let mut count = self.counts.entry((guild_id, inviter)).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Current count, 0 when the inviter has no referrals.
    pub fn get(&self, guild_id: GuildId, inviter: MemberId) -> u64 {
        self.counts
            .get(&(guild_id, inviter))
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// All counts of one guild, ordered by inviter.
    pub fn counts_for(&self, guild_id: GuildId) -> BTreeMap<MemberId, u64> {
        self.counts
            .iter()
            .filter(|entry| entry.key().0 == guild_id)
            .map(|entry| (entry.key().1, *entry.value()))
            .collect()
    }

    /// Number of inviters with at least one referral, across all guilds.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
