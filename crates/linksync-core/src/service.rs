//! Service facade
//!
//! Owns one engine per domain and routes cross-domain triggers (join, link,
//! manual resync) to all of them.

use futures::join;
use linksync_types::{GameId, LinkSyncConfig};
use parking_lot::RwLock;
use std::sync::Arc;

use crate::backend::Backends;
use crate::domains::{BanAdapter, GroupAdapter, GroupSync, MuteAdapter, PunishmentSync};
use crate::identity::{LinkedIdentity, Someone};
use crate::sync::ResyncSummary;

/// Shared sync service handle
#[derive(Clone)]
pub struct LinkSyncService {
    inner: Arc<LinkSyncInner>,
}

pub struct LinkSyncInner {
    pub bans: Arc<PunishmentSync<BanAdapter>>,
    pub mutes: Arc<PunishmentSync<MuteAdapter>>,
    pub groups: GroupSync,
    config: RwLock<LinkSyncConfig>,
}

impl LinkSyncService {
    /// Build every domain from a checked, normalized config.
    ///
    /// Must run inside a tokio runtime when any pair has a timer enabled.
    pub fn from_config(config: &LinkSyncConfig, backends: Backends) -> Self {
        let engine = &config.engine;
        let bans = PunishmentSync::new(
            BanAdapter::new(backends.punishments.clone(), backends.remote.clone()),
            backends.links.clone(),
            backends.presence.clone(),
            engine,
            &config.bans,
        );
        let mutes = PunishmentSync::new(
            MuteAdapter::new(backends.punishments.clone(), backends.remote.clone()),
            backends.links.clone(),
            backends.presence.clone(),
            engine,
            &config.mutes,
        );
        let groups = GroupSync::new(
            GroupAdapter::new(backends.permissions.clone(), backends.remote.clone()),
            backends.links.clone(),
            backends.presence.clone(),
            engine,
            &config.groups,
        );

        tracing::info!(
            "[LinkSync] Started (bans: {}, mutes: {}, group pairs: {})",
            config.bans.enabled,
            config.mutes.enabled,
            config.groups.len()
        );

        Self {
            inner: Arc::new(LinkSyncInner {
                bans,
                mutes,
                groups,
                config: RwLock::new(config.clone()),
            }),
        }
    }

    pub fn bans(&self) -> &Arc<PunishmentSync<BanAdapter>> {
        &self.inner.bans
    }

    pub fn mutes(&self) -> &Arc<PunishmentSync<MuteAdapter>> {
        &self.inner.mutes
    }

    pub fn groups(&self) -> &GroupSync {
        &self.inner.groups
    }

    pub fn config(&self) -> LinkSyncConfig {
        self.inner.config.read().clone()
    }

    /// Swap in a new pair configuration.
    ///
    /// Engine timings are fixed at construction; a changed `engine` section
    /// only takes effect on restart.
    pub fn reload(&self, config: &LinkSyncConfig) {
        let mut current = self.inner.config.write();
        if current.engine != config.engine {
            tracing::warn!("[LinkSync] Engine timings changed; restart to apply them");
        }

        self.inner.bans.reload(&config.bans);
        self.inner.mutes.reload(&config.mutes);
        self.inner.groups.reload(&config.groups);
        *current = config.clone();

        tracing::info!("[LinkSync] Configuration reloaded ({} group pair(s))", config.groups.len());
    }

    pub async fn on_game_join(&self, player: GameId, first_join: bool) -> ResyncSummary {
        let (bans, mutes, groups) = join!(
            self.inner.bans.on_game_join(player, first_join),
            self.inner.mutes.on_game_join(player, first_join),
            self.inner.groups.on_game_join(player),
        );
        merged([bans, mutes, groups])
    }

    pub async fn on_link(&self, identity: LinkedIdentity) -> ResyncSummary {
        let (bans, mutes, groups) = join!(
            self.inner.bans.on_link(identity),
            self.inner.mutes.on_link(identity),
            self.inner.groups.on_link(identity),
        );
        let summary = merged([bans, mutes, groups]);
        tracing::info!("[LinkSync] Link {} synchronized: {}", identity, summary);
        summary
    }

    /// Manual resync of every domain.
    pub async fn resync(&self, someone: Someone) -> ResyncSummary {
        let (bans, mutes, groups) = join!(
            self.inner.bans.resync(someone),
            self.inner.mutes.resync(someone),
            self.inner.groups.resync(someone),
        );
        merged([bans, mutes, groups])
    }

    /// Stop timers and drop pending debounced changes.
    pub fn shutdown(&self) {
        self.inner.bans.shutdown();
        self.inner.mutes.shutdown();
        self.inner.groups.shutdown();
        tracing::info!("[LinkSync] Stopped");
    }
}

fn merged(parts: [ResyncSummary; 3]) -> ResyncSummary {
    parts.into_iter().fold(ResyncSummary::default(), |mut acc, part| {
        acc.merge(part);
        acc
    })
}
