//! Plays a script against an engine backed by the in-memory platform.

use std::collections::BTreeSet;
use std::sync::Arc;

use invite_engine::{
    AttributionResult, EngineConfig, EngineEvent, GrantOutcome, InMemoryPlatform, InviteEngine,
    PlatformError, StartupReport,
};
use invite_types::{GuildId, InviteRecord, MemberId, RewardId};
use serde::Serialize;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, instrument, warn};

use crate::error::ReplayResult;
use crate::script::{GrantDenial, GuildSetup, Script, Step};

/// Result of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum StepOutcome {
    Startup(StartupReport),
    RewardSet { previous: Option<RewardId> },
    InviteCreated,
    InviteDeleted { existed: bool },
    Joins { joins: Vec<JoinRecord> },
    FetchDenied,
    FetchAllowed { was_denied: bool },
    GrantsDenied,
    GrantsAllowed { was_denied: bool },
    Grant { outcome: GrantOutcome },
}

/// One join and, when it reached the goal, the grant that followed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinRecord {
    pub result: AttributionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant: Option<GrantOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub step: Step,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InviterCount {
    pub inviter: MemberId,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuildCounts {
    pub guild_id: GuildId,
    pub inviters: Vec<InviterCount>,

    /// Engine events emitted for the guild during the replay.
    pub events: usize,
}

/// Everything a replay produced.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub steps: Vec<StepRecord>,
    pub events: Vec<EngineEvent>,
    pub counts: Vec<GuildCounts>,
}

impl ReplayReport {
    /// Final count of an inviter, zero when never credited.
    pub fn count(&self, guild_id: GuildId, inviter: MemberId) -> u64 {
        self.counts
            .iter()
            .find(|guild| guild.guild_id == guild_id)
            .and_then(|guild| guild.inviters.iter().find(|c| c.inviter == inviter))
            .map_or(0, |c| c.count)
    }
}

/// Engine plus the platform it runs against.
pub struct Replay {
    engine: InviteEngine,
    platform: Arc<InMemoryPlatform>,
    guilds: Vec<GuildId>,
    events: broadcast::Receiver<EngineEvent>,
}

impl Replay {
    /// Build the platform from the guild setups and an engine on top of it.
    pub fn new(config: EngineConfig, setups: &[GuildSetup]) -> ReplayResult<Self> {
        let platform = Arc::new(InMemoryPlatform::new());
        for setup in setups {
            platform.set_invites(setup.id, setup.invites.clone());
            if let Some(rewards) = &setup.rewards {
                platform.register_rewards(setup.id, rewards.iter().copied());
            }
        }

        let engine = InviteEngine::new(config, platform.clone())?;
        let events = engine.subscribe();

        Ok(Self {
            engine,
            platform,
            guilds: setups.iter().map(|setup| setup.id).collect(),
            events,
        })
    }

    pub fn engine(&self) -> &InviteEngine {
        &self.engine
    }

    pub fn platform(&self) -> &InMemoryPlatform {
        &self.platform
    }

    /// Play every step in order.
    pub async fn run(&mut self, steps: &[Step]) -> ReplayReport {
        let mut touched: BTreeSet<GuildId> = self.guilds.iter().copied().collect();
        let mut records = Vec::with_capacity(steps.len());
        let mut events = Vec::new();

        for (index, step) in steps.iter().enumerate() {
            if let Some(guild_id) = step_guild(step) {
                touched.insert(guild_id);
            }
            let outcome = self.apply(step).await;
            debug!(index, ?outcome, "Step applied");
            self.drain_events(&mut events);
            records.push(StepRecord {
                index,
                step: step.clone(),
                outcome,
            });
        }

        let counts = touched
            .into_iter()
            .map(|guild_id| GuildCounts {
                guild_id,
                inviters: self
                    .engine
                    .counter()
                    .counts_for(guild_id)
                    .into_iter()
                    .map(|(inviter, count)| InviterCount { inviter, count })
                    .collect(),
                events: events
                    .iter()
                    .filter(|event| event.guild_id() == guild_id)
                    .count(),
            })
            .collect();

        info!(steps = records.len(), events = events.len(), "Replay finished");

        ReplayReport {
            steps: records,
            events,
            counts,
        }
    }

    #[instrument(skip(self, step))]
    async fn apply(&self, step: &Step) -> StepOutcome {
        match step {
            Step::Startup { guilds } => {
                let guilds = guilds.as_deref().unwrap_or(&self.guilds);
                StepOutcome::Startup(self.engine.on_startup(guilds).await)
            }
            Step::SetReward { guild, reward } => StepOutcome::RewardSet {
                previous: self.engine.set_reward(*guild, *reward),
            },
            Step::CreateInvite {
                guild,
                code,
                inviter,
                uses,
            } => {
                self.platform
                    .create_invite(*guild, InviteRecord::new(code.clone(), *uses, *inviter));
                StepOutcome::InviteCreated
            }
            Step::DeleteInvite { guild, code } => StepOutcome::InviteDeleted {
                existed: self.platform.delete_invite(*guild, code),
            },
            Step::Join {
                guild,
                member,
                via,
                repeat,
            } => {
                let mut joins = Vec::new();
                for offset in 0..*repeat {
                    let member_id = MemberId::new(member.get() + offset);
                    if let Some(code) = via {
                        if self.platform.record_use(*guild, code).is_none() {
                            warn!(guild_id = %guild, code = %code, "Join through unknown invite");
                        }
                    }
                    joins.push(self.join(*guild, member_id).await);
                }
                StepOutcome::Joins { joins }
            }
            Step::DenyFetch { guild } => {
                self.platform.fail_fetch(
                    *guild,
                    PlatformError::PermissionDenied("manage_guild".into()),
                );
                StepOutcome::FetchDenied
            }
            Step::AllowFetch { guild } => StepOutcome::FetchAllowed {
                was_denied: self.platform.allow_fetch(*guild),
            },
            Step::DenyGrants { guild, kind } => {
                let error = match kind {
                    GrantDenial::Permission => PlatformError::PermissionDenied("manage_roles".into()),
                    GrantDenial::Hierarchy => match self.engine.reward_for(*guild) {
                        Some(reward_id) => PlatformError::Hierarchy(reward_id),
                        None => PlatformError::Unavailable("role hierarchy".into()),
                    },
                    GrantDenial::Unavailable => PlatformError::Unavailable("platform outage".into()),
                };
                self.platform.fail_grants(*guild, error);
                StepOutcome::GrantsDenied
            }
            Step::AllowGrants { guild } => StepOutcome::GrantsAllowed {
                was_denied: self.platform.allow_grants(*guild),
            },
            Step::GrantManual { guild, member } => StepOutcome::Grant {
                outcome: self.engine.grant_manually(*guild, *member).await,
            },
        }
    }

    /// Dispatch a join and carry out the grant intent it produced, if any.
    async fn join(&self, guild_id: GuildId, member_id: MemberId) -> JoinRecord {
        let result = self.engine.on_member_join(guild_id, member_id).await;
        let grant = match &result.grant_intent {
            Some(intent) => Some(self.engine.grant(intent).await),
            None => None,
        };
        JoinRecord { result, grant }
    }

    fn drain_events(&mut self, into: &mut Vec<EngineEvent>) {
        loop {
            match self.events.try_recv() {
                Ok(event) => into.push(event),
                Err(TryRecvError::Lagged(missed)) => {
                    warn!(missed, "Event buffer overflowed during replay");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

fn step_guild(step: &Step) -> Option<GuildId> {
    match step {
        Step::Startup { .. } => None,
        Step::SetReward { guild, .. }
        | Step::CreateInvite { guild, .. }
        | Step::DeleteInvite { guild, .. }
        | Step::Join { guild, .. }
        | Step::DenyFetch { guild }
        | Step::AllowFetch { guild }
        | Step::DenyGrants { guild, .. }
        | Step::AllowGrants { guild }
        | Step::GrantManual { guild, .. } => Some(*guild),
    }
}

/// Build a replay for a script and run it to completion.
pub async fn run_script(script: &Script, config: EngineConfig) -> ReplayResult<ReplayReport> {
    let mut replay = Replay::new(config, &script.guilds)?;
    Ok(replay.run(&script.steps).await)
}
