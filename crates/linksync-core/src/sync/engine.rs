//! Reconciliation core.

use dashmap::DashMap;
use futures::future::join_all;
use linksync_types::{
    EngineConfig, GameId, RemoteUserId, SyncCause, SyncResult, SyncSide, TieBreakers,
};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tokio::task::JoinHandle;

use super::adapter::{Pair, SyncAdapter, SyncTerms};
use super::expectation::ExpectationCache;
use super::policy;
use crate::backend::PresenceProvider;
use crate::error::SyncFailure;
use crate::identity::{LinkProvider, LinkedIdentity, Someone};

type LockKey = (String, GameId);

/// Result of one pair's reconciliation.
#[derive(Debug)]
pub struct PairOutcome {
    pub pair: String,
    pub outcome: Result<SyncResult, SyncFailure>,
}

impl PairOutcome {
    /// Result tag, with failures mapped to their reason.
    pub fn result(&self) -> SyncResult {
        outcome_result(&self.outcome)
    }
}

/// What happened to an inbound change notification.
#[derive(Debug)]
pub enum ChangeOutcome {
    /// The notification was the echo of our own write
    Suppressed,
    /// No configured pair covers the changed entity
    Unmapped,
    /// The account has no link
    NotLinked,
    Reconciled(Vec<PairOutcome>),
}

impl ChangeOutcome {
    pub const fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed)
    }

    /// Result tags of every reconciled pair.
    pub fn results(&self) -> Vec<SyncResult> {
        match self {
            Self::Reconciled(outcomes) => outcomes.iter().map(PairOutcome::result).collect(),
            Self::NotLinked => vec![SyncResult::NotLinked],
            Self::Suppressed | Self::Unmapped => Vec::new(),
        }
    }
}

pub(crate) fn outcome_result(outcome: &Result<SyncResult, SyncFailure>) -> SyncResult {
    match outcome {
        Ok(result) => *result,
        Err(failure) => failure.reason(),
    }
}

/// Per-(pair, player) serialization guard. Prunes its map entry on drop.
struct PairLock<'a> {
    locks: &'a DashMap<LockKey, Arc<tokio::sync::Mutex<()>>>,
    key: LockKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for PairLock<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.locks.remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Keeps every configured pair of one domain in sync.
pub struct SyncEngine<A: SyncAdapter> {
    pub(super) adapter: Arc<A>,
    pub(super) links: Arc<dyn LinkProvider>,
    pub(super) presence: Option<Arc<dyn PresenceProvider>>,
    pairs: RwLock<Vec<Arc<Pair<A>>>>,
    remote_expectations: ExpectationCache<(A::RemoteKey, RemoteUserId), A::State>,
    game_expectations: ExpectationCache<(A::GameKey, GameId), A::State>,
    locks: DashMap<LockKey, Arc<tokio::sync::Mutex<()>>>,
    pub(super) timers: Mutex<Vec<JoinHandle<()>>>,
}

impl<A: SyncAdapter> SyncEngine<A> {
    pub fn new(
        adapter: A,
        links: Arc<dyn LinkProvider>,
        presence: Option<Arc<dyn PresenceProvider>>,
        config: &EngineConfig,
    ) -> Self {
        let ttl = Duration::from_secs(config.expectation_ttl_secs);
        Self {
            adapter: Arc::new(adapter),
            links,
            presence,
            pairs: RwLock::new(Vec::new()),
            remote_expectations: ExpectationCache::new(ttl),
            game_expectations: ExpectationCache::new(ttl),
            locks: DashMap::new(),
            timers: Mutex::new(Vec::new()),
        }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn terms(&self) -> SyncTerms {
        self.adapter.terms()
    }

    /// Live pair list.
    pub fn configs(&self) -> Vec<Arc<Pair<A>>> {
        self.pairs.read().clone()
    }

    /// Replace the pair list wholesale, correcting contradicting tie-breakers.
    pub fn replace_pairs(&self, pairs: Vec<Pair<A>>) {
        let pairs: Vec<_> = pairs
            .into_iter()
            .map(|mut pair| {
                policy::normalize_settings(&mut pair.settings, &pair.label);
                Arc::new(pair)
            })
            .collect();
        tracing::debug!("[SyncEngine] {}: {} pair(s) configured", self.terms().domain, pairs.len());
        *self.pairs.write() = pairs;
    }

    /// Reconcile one pair using its configured tie-breakers.
    pub async fn reconcile(
        &self,
        pair: &Pair<A>,
        someone: Someone,
        cause: SyncCause,
    ) -> Result<SyncResult, SyncFailure> {
        self.reconcile_with(pair, someone, cause, pair.settings.tie_breakers).await
    }

    pub async fn reconcile_with(
        &self,
        pair: &Pair<A>,
        someone: Someone,
        cause: SyncCause,
        tie_breakers: TieBreakers,
    ) -> Result<SyncResult, SyncFailure> {
        let Some(identity) = someone.resolve(self.links.as_ref()).await? else {
            self.log_outcome(pair, &someone, cause, &Ok(SyncResult::NotLinked));
            return Ok(SyncResult::NotLinked);
        };
        self.attempt(pair, identity, cause, tie_breakers).await
    }

    /// Reconcile an already resolved identity, serialized per (pair, player).
    pub(super) async fn attempt(
        &self,
        pair: &Pair<A>,
        identity: LinkedIdentity,
        cause: SyncCause,
        tie_breakers: TieBreakers,
    ) -> Result<SyncResult, SyncFailure> {
        let outcome = {
            let _lock = self.lock_pair(pair, identity.game).await;
            self.compare_and_apply(pair, identity, cause, &tie_breakers).await
        };
        self.log_outcome(pair, &identity, cause, &outcome);
        outcome
    }

    async fn compare_and_apply(
        &self,
        pair: &Pair<A>,
        identity: LinkedIdentity,
        cause: SyncCause,
        tie_breakers: &TieBreakers,
    ) -> Result<SyncResult, SyncFailure> {
        let (game, remote) = tokio::try_join!(
            self.adapter.get_game(pair, identity),
            self.adapter.get_remote(pair, identity)
        )?;

        if self.adapter.states_match(&game, &remote) {
            return Ok(SyncResult::AlreadyInSync);
        }

        let decision = policy::decide(pair.settings.direction, tie_breakers, cause);
        if !decision.allowed {
            return Ok(SyncResult::WrongDirection);
        }

        let value = match decision.authority {
            SyncSide::Game => game,
            SyncSide::Remote => remote,
        };
        self.write(pair, identity, decision.target(), &value).await
    }

    /// Apply `value` to `target`, expecting its echo first.
    async fn write(
        &self,
        pair: &Pair<A>,
        identity: LinkedIdentity,
        target: SyncSide,
        value: &A::State,
    ) -> Result<SyncResult, SyncFailure> {
        match target {
            SyncSide::Remote => {
                let key = (pair.remote.clone(), identity.remote);
                self.remote_expectations.record(key.clone(), value.clone());
                let result = self.adapter.apply_remote(pair, identity, value).await;
                if !result.as_ref().is_ok_and(|r| r.is_change()) {
                    self.remote_expectations.forget(&key);
                }
                result
            },
            SyncSide::Game => {
                let key = (pair.game.clone(), identity.game);
                self.game_expectations.record(key.clone(), value.clone());
                let result = self.adapter.apply_game(pair, identity, value).await;
                if !result.as_ref().is_ok_and(|r| r.is_change()) {
                    self.game_expectations.forget(&key);
                }
                result
            },
        }
    }

    /// Consume the expectation of a remote-side echo.
    pub fn is_expected_remote(
        &self,
        key: &A::RemoteKey,
        remote: RemoteUserId,
        observed: &A::State,
    ) -> bool {
        self.remote_expectations.consume_if_expected(&(key.clone(), remote), observed, |e, o| {
            self.adapter.states_match(e, o)
        })
    }

    /// Consume the expectation of a game-side echo.
    pub fn is_expected_game(&self, key: &A::GameKey, game: GameId, observed: &A::State) -> bool {
        self.game_expectations.consume_if_expected(&(key.clone(), game), observed, |e, o| {
            self.adapter.states_match(e, o)
        })
    }

    /// The game side reported `state` for `game_key`.
    ///
    /// Echoes of our own writes are dropped. Otherwise the game side is
    /// authoritative and `state` is carried to the remote side of every pair
    /// bound to `game_key`. `cause` is only recorded in logs.
    pub async fn notify_game_changed(
        &self,
        cause: SyncCause,
        someone: Someone,
        game_key: &A::GameKey,
        state: A::State,
    ) -> Result<ChangeOutcome, SyncFailure> {
        let pairs: Vec<_> =
            self.configs().into_iter().filter(|pair| pair.game == *game_key).collect();
        if pairs.is_empty() {
            return Ok(ChangeOutcome::Unmapped);
        }

        let checked = match someone.game_id() {
            Some(game) if self.is_expected_game(game_key, game, &state) => {
                return Ok(self.suppressed(&someone, SyncSide::Game));
            },
            Some(_) => true,
            None => false,
        };

        let Some(identity) = someone.resolve(self.links.as_ref()).await? else {
            tracing::debug!("[SyncEngine] {} change for {}: not linked", self.terms().domain, someone);
            return Ok(ChangeOutcome::NotLinked);
        };
        if !checked && self.is_expected_game(game_key, identity.game, &state) {
            return Ok(self.suppressed(&someone, SyncSide::Game));
        }

        Ok(self.propagate_all(&pairs, identity, SyncSide::Game, &state, cause).await)
    }

    /// The remote side reported `state` for `remote_key`.
    pub async fn notify_remote_changed(
        &self,
        cause: SyncCause,
        someone: Someone,
        remote_key: &A::RemoteKey,
        state: A::State,
    ) -> Result<ChangeOutcome, SyncFailure> {
        let pairs: Vec<_> =
            self.configs().into_iter().filter(|pair| pair.remote == *remote_key).collect();
        if pairs.is_empty() {
            return Ok(ChangeOutcome::Unmapped);
        }

        let checked = match someone.remote_id() {
            Some(remote) if self.is_expected_remote(remote_key, remote, &state) => {
                return Ok(self.suppressed(&someone, SyncSide::Remote));
            },
            Some(_) => true,
            None => false,
        };

        let Some(identity) = someone.resolve(self.links.as_ref()).await? else {
            tracing::debug!("[SyncEngine] {} change for {}: not linked", self.terms().domain, someone);
            return Ok(ChangeOutcome::NotLinked);
        };
        if !checked && self.is_expected_remote(remote_key, identity.remote, &state) {
            return Ok(self.suppressed(&someone, SyncSide::Remote));
        }

        Ok(self.propagate_all(&pairs, identity, SyncSide::Remote, &state, cause).await)
    }

    fn suppressed(&self, someone: &Someone, side: SyncSide) -> ChangeOutcome {
        let terms = self.terms();
        let what = match side {
            SyncSide::Game => terms.game,
            SyncSide::Remote => terms.remote,
        };
        tracing::debug!(
            "[SyncEngine] {} {} change for {} is our own echo, ignoring",
            terms.domain,
            what,
            someone
        );
        ChangeOutcome::Suppressed
    }

    async fn propagate_all(
        &self,
        pairs: &[Arc<Pair<A>>],
        identity: LinkedIdentity,
        changed: SyncSide,
        state: &A::State,
        cause: SyncCause,
    ) -> ChangeOutcome {
        let outcomes = join_all(
            pairs.iter().map(|pair| self.propagate(pair, identity, changed, state, cause)),
        )
        .await;

        ChangeOutcome::Reconciled(
            pairs
                .iter()
                .zip(outcomes)
                .map(|(pair, outcome)| PairOutcome { pair: pair.label.clone(), outcome })
                .collect(),
        )
    }

    /// Carry a changed side's value to the other side of one pair.
    pub async fn propagate(
        &self,
        pair: &Pair<A>,
        identity: LinkedIdentity,
        changed: SyncSide,
        state: &A::State,
        cause: SyncCause,
    ) -> Result<SyncResult, SyncFailure> {
        let outcome = {
            let _lock = self.lock_pair(pair, identity.game).await;
            self.propagate_locked(pair, identity, changed, state).await
        };
        self.log_outcome(pair, &identity, cause, &outcome);
        outcome
    }

    async fn propagate_locked(
        &self,
        pair: &Pair<A>,
        identity: LinkedIdentity,
        changed: SyncSide,
        state: &A::State,
    ) -> Result<SyncResult, SyncFailure> {
        let in_sync = match changed {
            SyncSide::Game => {
                let remote = self.adapter.get_remote(pair, identity).await?;
                self.adapter.states_match(state, &remote)
            },
            SyncSide::Remote => {
                let game = self.adapter.get_game(pair, identity).await?;
                self.adapter.states_match(&game, state)
            },
        };
        if in_sync {
            return Ok(SyncResult::AlreadyInSync);
        }

        let change = match changed {
            SyncSide::Game => SyncCause::GameChange,
            SyncSide::Remote => SyncCause::RemoteChange,
        };
        let decision =
            policy::decide(pair.settings.direction, &pair.settings.tie_breakers, change);
        if !decision.allowed {
            return Ok(SyncResult::WrongDirection);
        }
        self.write(pair, identity, decision.target(), state).await
    }

    async fn lock_pair(&self, pair: &Pair<A>, game: GameId) -> PairLock<'_> {
        let key = (pair.label.clone(), game);
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let guard = lock.lock_owned().await;
        PairLock { locks: &self.locks, key, guard: Some(guard) }
    }

    fn log_outcome(
        &self,
        pair: &Pair<A>,
        who: &dyn fmt::Display,
        cause: SyncCause,
        outcome: &Result<SyncResult, SyncFailure>,
    ) {
        let domain = self.terms().domain;
        match outcome {
            Ok(result) if result.is_change() => tracing::debug!(
                identity = %who,
                cause = %cause,
                "[SyncEngine] {} {}: {}",
                domain,
                pair.describe(),
                result
            ),
            Ok(result) => tracing::debug!(
                identity = %who,
                cause = %cause,
                "[SyncEngine] {} {}: skipped ({})",
                domain,
                pair.describe(),
                result
            ),
            Err(failure) => tracing::warn!(
                identity = %who,
                cause = %cause,
                "[SyncEngine] {} {} failed: {}",
                domain,
                pair.describe(),
                failure
            ),
        }
    }
}

impl<A: SyncAdapter> Drop for SyncEngine<A> {
    fn drop(&mut self) {
        for handle in self.timers.lock().drain(..) {
            handle.abort();
        }
    }
}
