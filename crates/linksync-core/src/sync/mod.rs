//! Generic reconciliation engine.
//!
//! # Pipeline
//!
//! ```text
//! notification ──► expectation check ──► debouncer ──► reconcile ──► SyncResult
//!                  (drop own echoes)     (coalesce)    (read both sides,
//!                                                       decide, apply)
//! ```
//!
//! Every domain (bans, mutes, groups) implements [`SyncAdapter`] and gets the
//! same [`SyncEngine`]. Resync causes (join, link, command, timer) go through
//! [`SyncEngine::resync_all`]; change notifications go through
//! [`SyncEngine::notify_game_changed`] and [`SyncEngine::notify_remote_changed`].

mod adapter;
mod debounce;
mod engine;
mod expectation;
pub mod policy;
mod resync;


pub use adapter::{Pair, SyncAdapter, SyncPair, SyncTerms};
pub use debounce::{CommitFn, CommitTrigger, DebounceToken, EventDebouncer};
pub use engine::{ChangeOutcome, PairOutcome, SyncEngine};
pub use expectation::ExpectationCache;
pub use policy::Decision;
pub use resync::ResyncSummary;
