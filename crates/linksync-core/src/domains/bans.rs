//! Game bans ↔ remote guild bans.

use async_trait::async_trait;
use linksync_types::{GuildId, Punishment, SyncResult, SyncSide};
use std::sync::Arc;

use super::punishment::{check_guild, game_backend};
use crate::backend::{
    ensure_capabilities, Capability, PunishmentBackend, PunishmentType, RemotePlatform,
};
use crate::error::SyncFailure;
use crate::identity::LinkedIdentity;
use crate::sync::{Pair, SyncAdapter, SyncTerms};

const REQUIRED: &[Capability] = &[Capability::BanMembers];

pub struct BanAdapter {
    punishments: Option<Arc<dyn PunishmentBackend>>,
    remote: Arc<dyn RemotePlatform>,
}

impl BanAdapter {
    pub fn new(
        punishments: Option<Arc<dyn PunishmentBackend>>,
        remote: Arc<dyn RemotePlatform>,
    ) -> Self {
        Self { punishments, remote }
    }
}

#[async_trait]
impl SyncAdapter for BanAdapter {
    type State = Option<Punishment>;
    type GameKey = ();
    type RemoteKey = GuildId;

    fn terms(&self) -> SyncTerms {
        SyncTerms { domain: "bans", game: "ban", remote: "guild ban" }
    }

    fn removed_value(&self) -> Option<Punishment> {
        None
    }

    // Remote bans have no expiry and attribution is only in the audit log.
    fn states_match(&self, game: &Option<Punishment>, remote: &Option<Punishment>) -> bool {
        game.is_some() == remote.is_some()
    }

    fn required_capabilities(&self) -> &'static [Capability] {
        REQUIRED
    }

    async fn get_game(
        &self,
        _pair: &Pair<Self>,
        identity: LinkedIdentity,
    ) -> Result<Option<Punishment>, SyncFailure> {
        let backend = game_backend(self.punishments.as_ref())?;
        Ok(backend.get_punishment(PunishmentType::Ban, identity.game).await?)
    }

    async fn get_remote(
        &self,
        pair: &Pair<Self>,
        identity: LinkedIdentity,
    ) -> Result<Option<Punishment>, SyncFailure> {
        check_guild(pair.remote)?;
        Ok(self.remote.get_ban(pair.remote, identity.remote).await?)
    }

    async fn apply_game(
        &self,
        _pair: &Pair<Self>,
        identity: LinkedIdentity,
        state: &Option<Punishment>,
    ) -> Result<SyncResult, SyncFailure> {
        let backend = game_backend(self.punishments.as_ref())?;
        match state {
            Some(punishment) => {
                backend.add_punishment(PunishmentType::Ban, identity.game, punishment).await?;
            },
            None => backend.remove_punishment(PunishmentType::Ban, identity.game).await?,
        }
        Ok(SyncResult::applied(SyncSide::Game, state.is_some()))
    }

    async fn apply_remote(
        &self,
        pair: &Pair<Self>,
        identity: LinkedIdentity,
        state: &Option<Punishment>,
    ) -> Result<SyncResult, SyncFailure> {
        check_guild(pair.remote)?;
        ensure_capabilities(self.remote.as_ref(), pair.remote, self.required_capabilities()).await?;
        match state {
            // Temporary game bans become permanent here; the game side lifts them.
            Some(punishment) => {
                self.remote.ban(pair.remote, identity.remote, punishment.reason.as_deref()).await?;
            },
            None => self.remote.unban(pair.remote, identity.remote).await?,
        }
        Ok(SyncResult::applied(SyncSide::Remote, state.is_some()))
    }
}
