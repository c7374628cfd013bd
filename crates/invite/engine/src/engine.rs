//! Invite Engine - facade over the attribution components.
//!
//! The dispatcher calls in with three event kinds (startup, member join,
//! reward configuration) and gets structured results back. Deciding how to
//! notify anyone about them is left to the caller.

use std::sync::Arc;

use invite_types::{GrantIntent, GuildId, MemberId, RewardId};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::config::EngineConfig;
use crate::counter::ReferralCounter;
use crate::error::EngineResult;
use crate::events::EngineEvent;
use crate::outcome::{AttributionResult, GrantOutcome, JoinStatus, StartupReport};
use crate::platform::PlatformClient;
use crate::resolver::{AttributionResolver, Candidate};
use crate::reward_config::RewardConfigStore;
use crate::snapshot::SnapshotStore;
use crate::trigger::RewardTrigger;

/// Invite attribution and reward engine.
pub struct InviteEngine {
    /// Configuration.
    config: EngineConfig,

    /// Platform collaborator, used for grants.
    platform: Arc<dyn PlatformClient>,

    /// Last invite snapshot per guild.
    snapshots: Arc<SnapshotStore>,

    /// Snapshot diffing.
    resolver: AttributionResolver,

    /// Referral counts.
    counter: ReferralCounter,

    /// Reward per guild.
    rewards: Arc<RewardConfigStore>,

    /// Goal check.
    trigger: RewardTrigger,

    /// Event broadcaster.
    event_tx: broadcast::Sender<EngineEvent>,
}

impl InviteEngine {
    /// Create an engine. Fails only on invalid configuration.
    pub fn new(config: EngineConfig, platform: Arc<dyn PlatformClient>) -> EngineResult<Self> {
        config.validate()?;

        let (event_tx, _) = broadcast::channel(config.event_buffer);
        let snapshots = Arc::new(SnapshotStore::new());
        let rewards = Arc::new(RewardConfigStore::new());

        let resolver =
            AttributionResolver::new(platform.clone(), snapshots.clone(), config.fetch_timeout());
        let trigger = RewardTrigger::new(config.invite_goal, rewards.clone());

        Ok(Self {
            config,
            platform,
            snapshots,
            resolver,
            counter: ReferralCounter::new(),
            rewards,
            trigger,
            event_tx,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribe to engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.event_tx.subscribe()
    }

    fn emit(&self, event: EngineEvent) {
        // no receivers is fine
        let _ = self.event_tx.send(event);
    }

    /// Seed the snapshot of every guild the engine is responsible for.
    ///
    /// Guilds are seeded one after another; a failure is recorded and the
    /// remaining guilds are still seeded.
    #[instrument(skip(self, guilds), fields(guild_count = guilds.len()))]
    pub async fn on_startup(&self, guilds: &[GuildId]) -> StartupReport {
        let mut report = StartupReport::default();

        for &guild_id in guilds {
            match self.resolver.seed(guild_id).await {
                Ok(invites) => {
                    report.seeded.push(guild_id);
                    self.emit(EngineEvent::Seeded { guild_id, invites });
                }
                Err(e) => {
                    warn!(guild_id = %guild_id, error = %e, "Failed to seed invite snapshot");
                    let reason = e.to_string();
                    report.failed.push((guild_id, reason.clone()));
                    self.emit(EngineEvent::SeedFailed { guild_id, reason });
                }
            }
        }

        info!(
            seeded = report.seeded.len(),
            failed = report.failed.len(),
            "Invite snapshots seeded"
        );
        report
    }

    /// Handle a member joining a guild.
    ///
    /// Diffs invites to find the inviter, counts the referral and evaluates
    /// the goal. Fetch failures are reported in the result and leave every
    /// piece of state untouched.
    #[instrument(skip(self), fields(guild_id = %guild_id, member_id = %member_id))]
    pub async fn on_member_join(&self, guild_id: GuildId, member_id: MemberId) -> AttributionResult {
        let resolution = match self.resolver.resolve(guild_id).await {
            Ok(resolution) => resolution,
            Err(e) => {
                warn!(error = %e, "Skipping attribution, invites unavailable");
                self.emit(EngineEvent::FetchFailed {
                    guild_id,
                    member_id,
                    reason: e.to_string(),
                });
                return AttributionResult::unresolved(
                    guild_id,
                    member_id,
                    JoinStatus::from_fetch_error(&e),
                );
            }
        };

        let (code, inviter) = match resolution.candidate {
            Some(Candidate {
                code,
                inviter: Some(inviter),
                ..
            }) => (code, inviter),
            ownerless => {
                let code = ownerless.map(|c| c.code);
                debug!(code = ?code, "Join not traced to an owned invite");
                self.emit(EngineEvent::Unattributed {
                    guild_id,
                    member_id,
                    code: code.clone(),
                });
                let mut result =
                    AttributionResult::unresolved(guild_id, member_id, JoinStatus::Unattributed);
                result.invite_code = code;
                return result;
            }
        };

        let count = self.counter.increment(guild_id, inviter);
        info!(inviter = %inviter, count, code = %code, "Join attributed");
        self.emit(EngineEvent::Attributed {
            guild_id,
            member_id,
            inviter,
            code: code.clone(),
            count,
        });

        let grant_intent = self.trigger.evaluate(guild_id, inviter, count);
        if let Some(intent) = grant_intent {
            info!(
                inviter = %inviter,
                reward_id = %intent.reward_id,
                goal = self.trigger.goal(),
                "Invite goal reached"
            );
            self.emit(EngineEvent::GrantIntentIssued(intent));
        }

        AttributionResult {
            guild_id,
            member_id,
            inviter: Some(inviter),
            invite_code: Some(code),
            new_count: Some(count),
            grant_intent,
            status: JoinStatus::Attributed,
        }
    }

    /// Set the reward a guild grants at the goal, replacing any previous one.
    #[instrument(skip(self), fields(guild_id = %guild_id, reward_id = %reward_id))]
    pub fn set_reward(&self, guild_id: GuildId, reward_id: RewardId) -> Option<RewardId> {
        let previous = self.rewards.set(guild_id, reward_id);
        info!(previous = ?previous, "Reward configured");
        self.emit(EngineEvent::RewardConfigured {
            guild_id,
            reward_id,
            previous,
        });
        previous
    }

    /// Reward configured for a guild.
    pub fn reward_for(&self, guild_id: GuildId) -> Option<RewardId> {
        self.rewards.get(guild_id)
    }

    /// Referral count of an inviter in a guild.
    pub fn get_count(&self, guild_id: GuildId, inviter: MemberId) -> u64 {
        self.counter.get(guild_id, inviter)
    }

    /// Read access to the referral counts.
    pub fn counter(&self) -> &ReferralCounter {
        &self.counter
    }

    /// Read access to the stored snapshots.
    pub fn snapshots(&self) -> &SnapshotStore {
        &self.snapshots
    }

    /// Carry out a grant intent on the platform.
    ///
    /// Never retried. A failed grant does not undo the referral that
    /// produced the intent.
    #[instrument(skip(self, intent), fields(guild_id = %intent.guild_id, member_id = %intent.member_id))]
    pub async fn grant(&self, intent: &GrantIntent) -> GrantOutcome {
        self.apply_grant(intent.guild_id, intent.member_id, intent.reward_id)
            .await
    }

    /// Grant the guild's reward to a member by hand.
    ///
    /// Checks that a reward is configured and that the member does not hold
    /// it yet before granting. Authorization is the caller's job.
    #[instrument(skip(self), fields(guild_id = %guild_id, member_id = %member_id))]
    pub async fn grant_manually(&self, guild_id: GuildId, member_id: MemberId) -> GrantOutcome {
        let Some(reward_id) = self.rewards.get(guild_id) else {
            debug!("Manual grant without a configured reward");
            return GrantOutcome::NoRewardConfigured;
        };

        match self
            .platform
            .member_has_role(guild_id, member_id, reward_id)
            .await
        {
            Ok(true) => {
                debug!(reward_id = %reward_id, "Member already holds the reward");
                GrantOutcome::AlreadyHeld
            }
            Ok(false) => self.apply_grant(guild_id, member_id, reward_id).await,
            Err(e) => {
                warn!(error = %e, "Could not check member roles");
                self.emit(EngineEvent::GrantFailed {
                    guild_id,
                    member_id,
                    reward_id,
                    reason: e.to_string(),
                });
                GrantOutcome::from(e)
            }
        }
    }

    async fn apply_grant(
        &self,
        guild_id: GuildId,
        member_id: MemberId,
        reward_id: RewardId,
    ) -> GrantOutcome {
        match self
            .platform
            .grant_role(guild_id, member_id, reward_id)
            .await
        {
            Ok(()) => {
                info!(reward_id = %reward_id, "Reward granted");
                self.emit(EngineEvent::RewardGranted {
                    guild_id,
                    member_id,
                    reward_id,
                });
                GrantOutcome::Granted
            }
            Err(e) => {
                warn!(reward_id = %reward_id, error = %e, "Failed to grant reward");
                self.emit(EngineEvent::GrantFailed {
                    guild_id,
                    member_id,
                    reward_id,
                    reason: e.to_string(),
                });
                GrantOutcome::from(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::platform::InMemoryPlatform;
    use invite_types::InviteRecord;

    const GUILD: GuildId = GuildId::new(1);
    const X: MemberId = MemberId::new(100);
    const REWARD: RewardId = RewardId::new(7);

    fn setup(goal: u64) -> (InviteEngine, Arc<InMemoryPlatform>) {
        let platform = Arc::new(InMemoryPlatform::new());
        let engine = InviteEngine::new(EngineConfig::with_goal(goal), platform.clone()).unwrap();
        (engine, platform)
    }

    async fn join_via(engine: &InviteEngine, platform: &InMemoryPlatform, member: u64) -> AttributionResult {
        platform.record_use(GUILD, &"z".into());
        engine.on_member_join(GUILD, MemberId::new(member)).await
    }

    #[test]
    fn test_invalid_config_rejected() {
        let platform = Arc::new(InMemoryPlatform::new());
        assert!(InviteEngine::new(EngineConfig::with_goal(0), platform).is_err());
    }

    #[tokio::test]
    async fn test_join_counts_and_fires_at_goal() {
        let (engine, platform) = setup(2);
        platform.create_invite(GUILD, InviteRecord::owned_by("z", 0, X));
        engine.set_reward(GUILD, REWARD);
        engine.on_startup(&[GUILD]).await;

        let first = join_via(&engine, &platform, 1).await;
        assert!(first.is_attributed());
        assert_eq!(first.new_count, Some(1));
        assert!(first.grant_intent.is_none());

        let second = join_via(&engine, &platform, 2).await;
        let intent = second.grant_intent.unwrap();
        assert_eq!(intent.member_id, X);
        assert_eq!(intent.reward_id, REWARD);

        let third = join_via(&engine, &platform, 3).await;
        assert_eq!(third.new_count, Some(3));
        assert!(third.grant_intent.is_none());
    }

    #[tokio::test]
    async fn test_counting_without_reward() {
        let (engine, platform) = setup(1);
        platform.create_invite(GUILD, InviteRecord::owned_by("z", 0, X));
        engine.on_startup(&[GUILD]).await;

        let result = join_via(&engine, &platform, 1).await;
        assert_eq!(result.new_count, Some(1));
        assert!(result.grant_intent.is_none());
        assert_eq!(engine.get_count(GUILD, X), 1);
    }

    #[tokio::test]
    async fn test_ownerless_invite_is_unattributed() {
        let (engine, platform) = setup(1);
        platform.create_invite(GUILD, InviteRecord::new("z", 0, None));
        engine.on_startup(&[GUILD]).await;

        let result = join_via(&engine, &platform, 1).await;
        assert_eq!(result.status, JoinStatus::Unattributed);
        assert_eq!(result.invite_code.as_ref().map(|c| c.as_str()), Some("z"));
        assert!(engine.counter().is_empty());
    }

    #[tokio::test]
    async fn test_events_are_broadcast() {
        let (engine, platform) = setup(1);
        let mut events = engine.subscribe();
        platform.create_invite(GUILD, InviteRecord::owned_by("z", 0, X));
        engine.set_reward(GUILD, REWARD);
        engine.on_startup(&[GUILD]).await;
        join_via(&engine, &platform, 1).await;

        assert!(matches!(events.recv().await.unwrap(), EngineEvent::RewardConfigured { .. }));
        assert!(matches!(events.recv().await.unwrap(), EngineEvent::Seeded { invites: 1, .. }));
        assert!(matches!(events.recv().await.unwrap(), EngineEvent::Attributed { count: 1, .. }));
        assert!(matches!(events.recv().await.unwrap(), EngineEvent::GrantIntentIssued(_)));
    }

    #[tokio::test]
    async fn test_grant_failure_keeps_count() {
        let (engine, platform) = setup(1);
        platform.create_invite(GUILD, InviteRecord::owned_by("z", 0, X));
        platform.fail_grants(GUILD, PlatformError::Hierarchy(REWARD));
        engine.set_reward(GUILD, REWARD);
        engine.on_startup(&[GUILD]).await;

        let result = join_via(&engine, &platform, 1).await;
        let outcome = engine.grant(&result.grant_intent.unwrap()).await;

        assert_eq!(outcome, GrantOutcome::HierarchyError);
        assert_eq!(engine.get_count(GUILD, X), 1);
        assert!(platform.roles_of(GUILD, X).is_empty());
    }

    #[tokio::test]
    async fn test_manual_grant() {
        let (engine, platform) = setup(20);
        let member = MemberId::new(5);

        assert_eq!(
            engine.grant_manually(GUILD, member).await,
            GrantOutcome::NoRewardConfigured
        );

        engine.set_reward(GUILD, REWARD);
        assert_eq!(engine.grant_manually(GUILD, member).await, GrantOutcome::Granted);
        assert_eq!(engine.grant_manually(GUILD, member).await, GrantOutcome::AlreadyHeld);
        assert!(platform.roles_of(GUILD, member).contains(&REWARD));
    }

    #[tokio::test]
    async fn test_manual_grant_of_deleted_reward() {
        let (engine, platform) = setup(20);
        platform.register_rewards(GUILD, [RewardId::new(1)]);
        engine.set_reward(GUILD, REWARD);

        assert_eq!(
            engine.grant_manually(GUILD, MemberId::new(5)).await,
            GrantOutcome::RewardMissing
        );
    }
}
