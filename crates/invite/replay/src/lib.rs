//! # Invite Replay - scripted runs of the invite engine
//!
//! Loads a JSON script describing guilds, invites and a sequence of platform
//! events, plays it against [`invite_engine::InviteEngine`] on top of the
//! in-memory platform, and reports every step's result together with the
//! final referral counts.

pub mod config;
pub mod error;
pub mod runner;
pub mod script;

pub use config::{LoggingConfig, ReplayConfig};
pub use error::{ReplayError, ReplayResult};
pub use runner::{run_script, Replay, ReplayReport, StepOutcome};
pub use script::{GrantDenial, GuildSetup, Script, Step};
