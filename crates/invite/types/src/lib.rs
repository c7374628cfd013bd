//! Invite Types - shared data for invite attribution
//!
//! Plain data exchanged between the attribution engine and the platform
//! collaborators that feed it.
//!
//! ## Key Concepts
//!
//! - **InviteRecord**: one invite link with its cumulative use counter
//! - **InviteSnapshot**: every invite of a guild at one moment, in platform order
//! - **GrantIntent**: request to grant a guild's reward to an inviter

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod ids;
pub mod invite;
pub mod reward;

pub use ids::{GuildId, InviteCode, MemberId, RewardId};
pub use invite::{InviteRecord, InviteSnapshot};
pub use reward::GrantIntent;
