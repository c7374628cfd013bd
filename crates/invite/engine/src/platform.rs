//! Platform collaborator seam.
//!
//! The engine never talks to a chat platform directly. Everything it needs
//! from one (listing invites, granting a reward role) goes through
//! [`PlatformClient`], so the engine stays free of any transport.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use invite_types::{GuildId, InviteCode, InviteRecord, MemberId, RewardId};

use crate::error::PlatformError;

/// Client trait for the community platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// List every active invite of a guild, in platform enumeration order.
    async fn fetch_invites(&self, guild_id: GuildId) -> Result<Vec<InviteRecord>, PlatformError>;

    /// Grant a reward role to a member.
    async fn grant_role(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        reward_id: RewardId,
    ) -> Result<(), PlatformError>;

    /// Whether a member already holds a reward role.
    async fn member_has_role(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        reward_id: RewardId,
    ) -> Result<bool, PlatformError>;
}

/// In-memory platform for tests and scripted replays.
///
/// Holds invite lists per guild and the roles handed out so far. Failures can
/// be injected per guild for both invite listing and role grants.
#[derive(Default)]
pub struct InMemoryPlatform {
    /// Invites per guild, in creation order.
    invites: DashMap<GuildId, Vec<InviteRecord>>,

    /// Guilds whose invite listing fails, with the error to return.
    fetch_failures: DashMap<GuildId, PlatformError>,

    /// Guilds whose grants fail, with the error to return.
    grant_failures: DashMap<GuildId, PlatformError>,

    /// Roles held per member.
    roles: DashMap<(GuildId, MemberId), HashSet<RewardId>>,

    /// Rewards that exist per guild. Guilds absent here accept any reward.
    known_rewards: DashMap<GuildId, HashSet<RewardId>>,

    /// Artificial latency added to every invite listing.
    fetch_delay: Option<Duration>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every invite listing, to widen race windows in tests.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    /// Replace a guild's invite list.
    pub fn set_invites(&self, guild_id: GuildId, invites: Vec<InviteRecord>) {
        self.invites.insert(guild_id, invites);
    }

    /// Add an invite, replacing any invite with the same code.
    pub fn create_invite(&self, guild_id: GuildId, invite: InviteRecord) {
        let mut invites = self.invites.entry(guild_id).or_default();
        match invites.iter_mut().find(|i| i.code == invite.code) {
            Some(existing) => *existing = invite,
            None => invites.push(invite),
        }
    }

    /// Remove an invite. Returns whether it existed.
    pub fn delete_invite(&self, guild_id: GuildId, code: &InviteCode) -> bool {
        match self.invites.get_mut(&guild_id) {
            Some(mut invites) => {
                let before = invites.len();
                invites.retain(|i| &i.code != code);
                invites.len() != before
            }
            None => false,
        }
    }

    /// Record one join through an invite. Returns the new use count, or
    /// `None` when the invite does not exist.
    pub fn record_use(&self, guild_id: GuildId, code: &InviteCode) -> Option<u64> {
        let mut invites = self.invites.get_mut(&guild_id)?;
        let invite = invites.iter_mut().find(|i| &i.code == code)?;
        invite.uses += 1;
        Some(invite.uses)
    }

    /// Make invite listing fail for a guild.
    pub fn fail_fetch(&self, guild_id: GuildId, error: PlatformError) {
        self.fetch_failures.insert(guild_id, error);
    }

    /// Make grants fail for a guild.
    pub fn fail_grants(&self, guild_id: GuildId, error: PlatformError) {
        self.grant_failures.insert(guild_id, error);
    }

    /// Let invite listing succeed again. Returns whether a failure was set.
    pub fn allow_fetch(&self, guild_id: GuildId) -> bool {
        self.fetch_failures.remove(&guild_id).is_some()
    }

    /// Let grants succeed again. Returns whether a failure was set.
    pub fn allow_grants(&self, guild_id: GuildId) -> bool {
        self.grant_failures.remove(&guild_id).is_some()
    }

    /// Clear injected failures for a guild.
    pub fn heal(&self, guild_id: GuildId) {
        self.allow_fetch(guild_id);
        self.allow_grants(guild_id);
    }

    /// Declare the rewards that exist in a guild; grants of any other reward
    /// fail with [`PlatformError::RewardNotFound`].
    pub fn register_rewards(&self, guild_id: GuildId, rewards: impl IntoIterator<Item = RewardId>) {
        self.known_rewards
            .entry(guild_id)
            .or_default()
            .extend(rewards);
    }

    /// Roles a member holds.
    pub fn roles_of(&self, guild_id: GuildId, member_id: MemberId) -> HashSet<RewardId> {
        self.roles
            .get(&(guild_id, member_id))
            .map(|roles| roles.clone())
            .unwrap_or_default()
    }

    /// Number of roles granted across all guilds.
    pub fn grant_count(&self) -> usize {
        self.roles.iter().map(|entry| entry.value().len()).sum()
    }
}

#[async_trait]
impl PlatformClient for InMemoryPlatform {
    async fn fetch_invites(&self, guild_id: GuildId) -> Result<Vec<InviteRecord>, PlatformError> {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.fetch_failures.get(&guild_id) {
            return Err(error.clone());
        }

        Ok(self
            .invites
            .get(&guild_id)
            .map(|invites| invites.clone())
            .unwrap_or_default())
    }

    async fn grant_role(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        reward_id: RewardId,
    ) -> Result<(), PlatformError> {
        if let Some(error) = self.grant_failures.get(&guild_id) {
            return Err(error.clone());
        }

        if let Some(known) = self.known_rewards.get(&guild_id) {
            if !known.contains(&reward_id) {
                return Err(PlatformError::RewardNotFound(reward_id));
            }
        }

        self.roles
            .entry((guild_id, member_id))
            .or_default()
            .insert(reward_id);
        Ok(())
    }

    async fn member_has_role(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        reward_id: RewardId,
    ) -> Result<bool, PlatformError> {
        Ok(self
            .roles
            .get(&(guild_id, member_id))
            .is_some_and(|roles| roles.contains(&reward_id)))
    }
}
