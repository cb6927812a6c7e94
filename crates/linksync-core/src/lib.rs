//! # linksync Core
//!
//! Reconciliation engine keeping game-server punishments and permission
//! groups consistent with a remote chat platform.
//!
//! ## Architecture
//!
//! ```text
//! notification ──► expectation check ──► debouncer ──► SyncEngine
//!                  (drop own echoes)     (coalesce)     │
//!                                                       ├─ read both sides (SyncAdapter)
//!                                                       ├─ decide authority (policy)
//!                                                       └─ apply + record expectation
//! ```
//!
//! - `sync/`     : generic engine, policy, expectation cache, debouncer, resync timers
//! - `domains/`  : bans, mutes and group ↔ role adapters with their facades
//! - `backend/`  : traits for the systems of record plus in-memory implementations
//! - `service`   : one handle owning every domain
//!
//! Hosts implement the [`backend`] traits over their real clients, build a
//! [`LinkSyncService`] from a loaded config and forward platform events to it.

#![allow(
    clippy::significant_drop_tightening,
    reason = "Lock guards in async code are scoped by hand around awaits"
)]
#![allow(clippy::module_name_repetitions, reason = "SyncEngine, SyncPair read better in logs")]
#![cfg_attr(
    test,
    allow(clippy::panic, clippy::print_stdout, clippy::assertions_on_result_states)
)]

pub mod backend;
pub mod config;
pub mod domains;
pub mod error;
pub mod identity;
pub mod logger;
pub mod service;
pub mod sync;

pub use config::{load_config, load_config_with_warnings, parse_config};
pub use error::{GameError, LinkError, RemoteError, SyncFailure};
pub use identity::{LinkProvider, LinkedIdentity, Someone};
pub use logger::init_logger;
pub use service::LinkSyncService;
pub use sync::{ChangeOutcome, ResyncSummary, SyncAdapter, SyncEngine, SyncPair};
