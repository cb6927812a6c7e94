//! Core domain models for linksync.
//!
//! This module contains all shared data structures used by the engine and tooling.

mod config;
mod ids;
mod punishment;
mod sync;

// Re-export all models
pub use config::{EngineConfig, GroupSyncPairConfig, LinkSyncConfig, PunishmentSyncConfig};
pub use ids::{GameId, GuildId, RemoteUserId, RoleId};
pub use punishment::Punishment;
pub use sync::{
    ResultCategory, ResyncCause, SyncCause, SyncDirection, SyncResult, SyncSettings, SyncSide,
    TieBreakerCorrection, TieBreakers, TimerConfig,
};
