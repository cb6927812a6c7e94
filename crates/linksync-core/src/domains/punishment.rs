//! Shared punishment sync (bans and mutes).

use chrono::Utc;
use futures::FutureExt;
use linksync_types::{
    EngineConfig, GameId, GuildId, Punishment, PunishmentSyncConfig, RemoteUserId, ResyncCause,
    SyncCause, SyncSide,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{PresenceProvider, PunishmentBackend};
use crate::error::{GameError, SyncFailure};
use crate::identity::{LinkProvider, LinkedIdentity, Someone};
use crate::sync::{
    policy, ChangeOutcome, CommitFn, CommitTrigger, EventDebouncer, Pair, ResyncSummary,
    SyncAdapter, SyncEngine, SyncPair,
};

/// Adapters whose state is an optional punishment in one guild.
pub trait PunishmentAdapter:
    SyncAdapter<State = Option<Punishment>, GameKey = (), RemoteKey = GuildId>
{
}

impl<T> PunishmentAdapter for T where
    T: SyncAdapter<State = Option<Punishment>, GameKey = (), RemoteKey = GuildId>
{
}

pub(super) fn game_backend(
    backend: Option<&Arc<dyn PunishmentBackend>>,
) -> Result<&dyn PunishmentBackend, SyncFailure> {
    backend.map(|backend| &**backend).ok_or_else(|| GameError::Unavailable("punishment").into())
}

pub(super) fn check_guild(guild: GuildId) -> Result<(), SyncFailure> {
    if guild.is_unset() {
        return Err(SyncFailure::invalid_config("guild id is not set"));
    }
    Ok(())
}

/// A remote-side ban/timeout observation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePunishmentEvent {
    pub guild: GuildId,
    pub user: RemoteUserId,
    pub punishment: Option<Punishment>,
}

/// Build the single pair of a punishment domain, if enabled.
pub fn punishment_pairs<A: PunishmentAdapter>(
    domain: &str,
    config: &PunishmentSyncConfig,
) -> Vec<Pair<A>> {
    if !config.enabled {
        return Vec::new();
    }
    vec![SyncPair::new(format!("{domain}:{}", config.guild_id), config.settings, (), config.guild_id)]
}

/// Entry points for one punishment domain.
pub struct PunishmentSync<A: PunishmentAdapter> {
    engine: Arc<SyncEngine<A>>,
    debouncer: EventDebouncer<(GuildId, RemoteUserId), RemotePunishmentEvent>,
    remote_wins_on_first_join: AtomicBool,
}

impl<A: PunishmentAdapter> PunishmentSync<A> {
    pub fn new(
        adapter: A,
        links: Arc<dyn LinkProvider>,
        presence: Option<Arc<dyn PresenceProvider>>,
        engine_config: &EngineConfig,
        config: &PunishmentSyncConfig,
    ) -> Arc<Self> {
        let engine = Arc::new(SyncEngine::new(adapter, links, presence, engine_config));
        let domain = engine.terms().domain;

        let weak = Arc::downgrade(&engine);
        let commit: CommitFn<RemotePunishmentEvent> =
            Arc::new(move |event: RemotePunishmentEvent, trigger: CommitTrigger| {
                let weak = weak.clone();
                async move {
                    let Some(engine) = weak.upgrade() else {
                        return;
                    };
                    tracing::debug!(
                        "[Debounce] {} {}: committing remote change ({})",
                        engine.terms().domain,
                        event.user,
                        trigger
                    );
                    let result = engine
                        .notify_remote_changed(
                            SyncCause::RemoteChange,
                            Someone::Remote(event.user),
                            &event.guild,
                            event.punishment,
                        )
                        .await;
                    if let Err(failure) = result {
                        tracing::warn!(
                            "[Debounce] {} {}: remote change dropped: {}",
                            engine.terms().domain,
                            event.user,
                            failure
                        );
                    }
                }
                .boxed()
            });

        let sync = Arc::new(Self {
            debouncer: EventDebouncer::new(
                domain,
                Duration::from_millis(engine_config.debounce_ms),
                commit,
            ),
            engine,
            remote_wins_on_first_join: AtomicBool::new(config.remote_wins_on_first_join),
        });
        sync.reload(config);
        sync
    }

    pub fn engine(&self) -> &Arc<SyncEngine<A>> {
        &self.engine
    }

    pub fn reload(&self, config: &PunishmentSyncConfig) {
        self.remote_wins_on_first_join.store(config.remote_wins_on_first_join, Ordering::SeqCst);
        self.engine.reload(punishment_pairs::<A>(self.engine.terms().domain, config));
    }

    /// Minimal remote notification (ban/unban, timeout change).
    ///
    /// Our own echoes are dropped at once; anything else waits for a richer
    /// audit entry until the debounce deadline. Callable from any thread.
    pub fn on_remote_changed(
        &self,
        guild: GuildId,
        user: RemoteUserId,
        punishment: Option<Punishment>,
    ) -> bool {
        if self.engine.is_expected_remote(&guild, user, &punishment) {
            tracing::debug!(
                "[Debounce] {} {}: own echo, not debounced",
                self.engine.terms().domain,
                user
            );
            return false;
        }
        self.debouncer.upsert((guild, user), RemotePunishmentEvent { guild, user, punishment });
        true
    }

    /// Audit-log entry carrying attribution for a remote change.
    ///
    /// Fields the entry lacks are taken from the pending minimal event. An
    /// entry whose presence disagrees with the pending event describes a
    /// change that event already superseded: the pending event commits as is
    /// and the entry is dropped.
    pub async fn on_audit_log_entry(
        &self,
        guild: GuildId,
        user: RemoteUserId,
        punishment: Option<Punishment>,
    ) -> CommitTrigger {
        let key = (guild, user);
        let punishment = match self.debouncer.pending_value(&key).map(|event| event.punishment) {
            Some(minimal) if minimal.is_some() != punishment.is_some() => {
                tracing::debug!(
                    "[Debounce] {} {}: stale audit entry, committing pending change",
                    self.engine.terms().domain,
                    user
                );
                if !self.debouncer.flush(&key).await {
                    tracing::debug!(
                        "[Debounce] {} {}: pending change already committed",
                        self.engine.terms().domain,
                        user
                    );
                }
                return CommitTrigger::Flushed;
            },
            Some(Some(minimal)) => punishment.map(|audit| audit.merge_attribution(&minimal)),
            _ => punishment,
        };
        self.debouncer.enrich(&key, RemotePunishmentEvent { guild, user, punishment }).await
    }

    /// A punishment issued in game. One that has already run out counts as
    /// a pardon.
    pub async fn on_game_punished(
        &self,
        player: GameId,
        punishment: Punishment,
    ) -> Result<ChangeOutcome, SyncFailure> {
        let now = Utc::now();
        let state = Some(punishment).filter(|punishment| !punishment.is_elapsed(now));
        self.engine
            .notify_game_changed(SyncCause::GameChange, Someone::Game(player), &(), state)
            .await
    }

    pub async fn on_game_pardoned(&self, player: GameId) -> Result<ChangeOutcome, SyncFailure> {
        let removed = self.engine.adapter().removed_value();
        self.engine
            .notify_game_changed(SyncCause::GameChange, Someone::Game(player), &(), removed)
            .await
    }

    /// Resync on join. A first join makes the remote side authoritative so a
    /// fresh account cannot slip past an existing remote punishment.
    pub async fn on_game_join(&self, player: GameId, first_join: bool) -> ResyncSummary {
        let remote_wins = first_join && self.remote_wins_on_first_join.load(Ordering::SeqCst);
        self.engine
            .resync_all(ResyncCause::GameJoin, Someone::Game(player), move |cause, side| {
                if remote_wins && cause == ResyncCause::GameJoin {
                    SyncSide::Remote
                } else {
                    side
                }
            })
            .await
    }

    pub async fn on_link(&self, identity: LinkedIdentity) -> ResyncSummary {
        self.engine.resync_all(ResyncCause::Link, identity.into(), policy::configured).await
    }

    pub async fn resync(&self, someone: Someone) -> ResyncSummary {
        self.engine.resync_all(ResyncCause::Command, someone, policy::configured).await
    }

    pub fn is_pending(&self, guild: GuildId, user: RemoteUserId) -> bool {
        self.debouncer.is_pending(&(guild, user))
    }

    pub fn shutdown(&self) {
        let dropped = self.debouncer.cancel_all();
        if dropped > 0 {
            tracing::info!(
                "[Debounce] {}: dropped {} pending change(s)",
                self.engine.terms().domain,
                dropped
            );
        }
        self.engine.shutdown();
    }
}
