//! Sync Types for Game ↔ Remote Reconciliation
//!
//! Describes how one configured sync pair behaves when its two sides disagree.
//!
//! # Model
//!
//! - A [`SyncDirection`] restricts which side may be written
//! - A [`TieBreakers`] table picks the authoritative side per resync cause
//! - Change causes ([`SyncCause::GameChange`], [`SyncCause::RemoteChange`])
//!   make the changed side authoritative
//! - Every attempt produces exactly one [`SyncResult`]

mod direction;
mod result;
mod settings;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests_tiebreaker;

pub use direction::{ResyncCause, SyncCause, SyncDirection, SyncSide};
pub use result::{ResultCategory, SyncResult};
pub use settings::{SyncSettings, TieBreakerCorrection, TieBreakers, TimerConfig};
