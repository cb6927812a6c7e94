//! # linksync Types
//!
//! Core types, sync models, and error definitions for linksync.
//!
//! This crate provides the foundational type system shared by the engine and
//! the operator tooling:
//!
//! - **`error`** - Typed configuration errors
//! - **`models`** - Identifiers, sync enums, tie-breaker tables, results,
//!   punishments and the configuration document
//!
//! ## Architecture Role
//!
//! `linksync-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!          linksync-types (this crate)
//!                  │
//!                  ▼
//!            linksync-core
//!                  │
//!                  ▼
//!            linksync-cli
//! ```
//!
//! All types are designed to be:
//! - **Serializable** via serde for config files and summaries
//! - **Clone** for cheap sharing across async boundaries
//! - **PartialEq** for testing and comparison

pub mod error;
pub mod models;

pub use error::{ConfigError, Result};

pub use models::{
    EngineConfig, GameId, GroupSyncPairConfig, GuildId, LinkSyncConfig, Punishment,
    PunishmentSyncConfig, RemoteUserId, ResultCategory, ResyncCause, RoleId, SyncCause,
    SyncDirection, SyncResult, SyncSettings, SyncSide, TieBreakerCorrection, TieBreakers,
    TimerConfig,
};
