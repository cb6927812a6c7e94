//! Game mutes ↔ remote member timeouts.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use linksync_types::{GuildId, Punishment, SyncResult, SyncSide};
use std::sync::Arc;

use super::punishment::{check_guild, game_backend};
use crate::backend::{
    ensure_capabilities, Capability, PunishmentBackend, PunishmentType, RemotePlatform,
};
use crate::error::SyncFailure;
use crate::identity::LinkedIdentity;
use crate::sync::{Pair, SyncAdapter, SyncTerms};

const REQUIRED: &[Capability] = &[Capability::ModerateMembers];

/// Longest timeout the remote platform accepts.
pub fn max_timeout() -> Duration {
    Duration::days(28)
}

pub struct MuteAdapter {
    punishments: Option<Arc<dyn PunishmentBackend>>,
    remote: Arc<dyn RemotePlatform>,
}

impl MuteAdapter {
    pub fn new(
        punishments: Option<Arc<dyn PunishmentBackend>>,
        remote: Arc<dyn RemotePlatform>,
    ) -> Self {
        Self { punishments, remote }
    }
}

#[async_trait]
impl SyncAdapter for MuteAdapter {
    type State = Option<Punishment>;
    type GameKey = ();
    type RemoteKey = GuildId;

    fn terms(&self) -> SyncTerms {
        SyncTerms { domain: "mutes", game: "mute", remote: "timeout" }
    }

    fn removed_value(&self) -> Option<Punishment> {
        None
    }

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
        let mute = backend.get_punishment(PunishmentType::Mute, identity.game).await?;
        // Expired mutes linger until the game side purges them.
        Ok(mute.filter(|mute| !mute.is_elapsed(Utc::now())))
    }

    async fn get_remote(
        &self,
        pair: &Pair<Self>,
        identity: LinkedIdentity,
    ) -> Result<Option<Punishment>, SyncFailure> {
        check_guild(pair.remote)?;
        let until = self.remote.get_timeout(pair.remote, identity.remote).await?;
        // An elapsed timeout is still reported by some clients until the member changes.
        Ok(until.filter(|until| *until > Utc::now()).map(Punishment::until))
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
                backend.add_punishment(PunishmentType::Mute, identity.game, punishment).await?;
            },
            None => backend.remove_punishment(PunishmentType::Mute, identity.game).await?,
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
        let Some(punishment) = state else {
            ensure_capabilities(self.remote.as_ref(), pair.remote, self.required_capabilities())
                .await?;
            self.remote.remove_timeout(pair.remote, identity.remote).await?;
            return Ok(SyncResult::RemovedRemote);
        };

        let Some(until) = punishment.until else {
            return Err(SyncFailure::new(
                SyncResult::PunishmentTooLong,
                "permanent mutes cannot be expressed as a timeout",
            ));
        };
        let now = Utc::now();
        if until - now > max_timeout() {
            return Err(SyncFailure::new(
                SyncResult::PunishmentTooLong,
                format!("mute until {until} exceeds the 28 day timeout limit"),
            ));
        }

        ensure_capabilities(self.remote.as_ref(), pair.remote, self.required_capabilities()).await?;
        if until <= now {
            self.remote.remove_timeout(pair.remote, identity.remote).await?;
            return Ok(SyncResult::RemovedRemote);
        }
        self.remote
            .set_timeout(pair.remote, identity.remote, until, punishment.reason.as_deref())
            .await?;
        Ok(SyncResult::AddedRemote)
    }
}
