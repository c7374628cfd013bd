//! # Invite Engine - invite attribution and referral rewards
//!
//! Works out which invite link brought each new member into a guild, counts
//! referrals per inviter, and issues a reward grant intent when an inviter
//! reaches the configured goal.
//!
//! ## Overview
//!
//! Platforms only expose cumulative use counters per invite. The engine keeps
//! the last snapshot of those counters for every guild and, on each join,
//! diffs a freshly fetched snapshot against it: the invite whose counter
//! moved is the one the member used.
//!
//! - **Snapshot Store**: last invite snapshot per guild, locked per guild
//! - **Attribution Resolver**: fetch, diff, replace for one join
//! - **Referral Counter**: monotonic count per guild and inviter
//! - **Reward Trigger**: fires once, when a count equals the goal
//! - **Reward Config Store**: the reward each guild hands out
//!
//! ## Architectural Boundaries
//!
//! - The **platform** owns invites and roles, reached through [`PlatformClient`]
//! - The **dispatcher** owns commands, permissions and message formatting
//! - **invite-engine** owns attribution state and the reward decision
//!
//! State lives in process memory only and is lost on restart.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use invite_engine::{EngineConfig, InMemoryPlatform, InviteEngine};
//! use invite_types::{GuildId, InviteRecord, MemberId, RewardId};
//!
//! # async fn example() {
//! let guild = GuildId::new(1);
//! let inviter = MemberId::new(100);
//!
//! let platform = Arc::new(InMemoryPlatform::new());
//! platform.create_invite(guild, InviteRecord::owned_by("z", 0, inviter));
//!
//! let engine = InviteEngine::new(EngineConfig::default(), platform.clone()).unwrap();
//! engine.set_reward(guild, RewardId::new(7));
//! engine.on_startup(&[guild]).await;
//!
//! platform.record_use(guild, &"z".into());
//! let result = engine.on_member_join(guild, MemberId::new(2)).await;
//! assert_eq!(result.inviter, Some(inviter));
//!
//! if let Some(intent) = result.grant_intent {
//!     engine.grant(&intent).await;
//! }
//! # }
//! ```

pub mod config;
pub mod counter;
pub mod engine;
pub mod error;
pub mod events;
pub mod outcome;
pub mod platform;
pub mod resolver;
pub mod reward_config;
pub mod snapshot;
pub mod trigger;

// Re-export main types
pub use config::EngineConfig;
pub use counter::ReferralCounter;
pub use engine::InviteEngine;
pub use error::{EngineError, EngineResult, PlatformError};
pub use events::EngineEvent;
pub use outcome::{AttributionResult, GrantOutcome, JoinStatus, StartupReport};
pub use platform::{InMemoryPlatform, PlatformClient};
pub use resolver::{AttributionResolver, Candidate, Resolution};
pub use reward_config::RewardConfigStore;
pub use snapshot::{SnapshotGuard, SnapshotStore};
pub use trigger::RewardTrigger;
