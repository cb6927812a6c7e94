//! Domain adapter contract.

use async_trait::async_trait;
use linksync_types::{SyncResult, SyncSettings};
use std::fmt::Debug;
use std::hash::Hash;

use crate::backend::Capability;
use crate::error::SyncFailure;
use crate::identity::LinkedIdentity;

/// One configured binding between a game-side and a remote-side entity.
///
/// Built at load/reload and replaced wholesale; never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPair<G, R> {
    pub settings: SyncSettings,
    pub game: G,
    pub remote: R,
    /// Unique per engine; used in logs, summaries and lock keys
    pub label: String,
}

impl<G, R> SyncPair<G, R> {
    pub fn new(label: impl Into<String>, settings: SyncSettings, game: G, remote: R) -> Self {
        Self { settings, game, remote, label: label.into() }
    }

    pub fn describe(&self) -> &str {
        &self.label
    }
}

/// Words used when logging a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTerms {
    pub domain: &'static str,
    pub game: &'static str,
    pub remote: &'static str,
}

pub type Pair<A> = SyncPair<<A as SyncAdapter>::GameKey, <A as SyncAdapter>::RemoteKey>;

/// Reads and writes one domain on both systems.
///
/// Reads never mutate. Writes must be idempotent: periodic resyncs repeat
/// them freely.
#[async_trait]
pub trait SyncAdapter: Send + Sync + 'static {
    type State: Clone + Debug + Send + Sync + 'static;
    type GameKey: Clone + Debug + Eq + Hash + Send + Sync + 'static;
    type RemoteKey: Clone + Debug + Eq + Hash + Send + Sync + 'static;

    fn terms(&self) -> SyncTerms;

    /// Canonical absent value.
    fn removed_value(&self) -> Self::State;

    fn states_match(&self, game: &Self::State, remote: &Self::State) -> bool;

    fn required_capabilities(&self) -> &'static [Capability];

    async fn get_game(
        &self,
        pair: &SyncPair<Self::GameKey, Self::RemoteKey>,
        identity: LinkedIdentity,
    ) -> Result<Self::State, SyncFailure>;

    async fn get_remote(
        &self,
        pair: &SyncPair<Self::GameKey, Self::RemoteKey>,
        identity: LinkedIdentity,
    ) -> Result<Self::State, SyncFailure>;

    async fn apply_game(
        &self,
        pair: &SyncPair<Self::GameKey, Self::RemoteKey>,
        identity: LinkedIdentity,
        state: &Self::State,
    ) -> Result<SyncResult, SyncFailure>;

    async fn apply_remote(
        &self,
        pair: &SyncPair<Self::GameKey, Self::RemoteKey>,
        identity: LinkedIdentity,
        state: &Self::State,
    ) -> Result<SyncResult, SyncFailure>;
}
