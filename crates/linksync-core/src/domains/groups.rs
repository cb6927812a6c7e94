//! Game permission groups ↔ remote roles.

use async_trait::async_trait;
use linksync_types::{
    EngineConfig, GameId, GroupSyncPairConfig, GuildId, RemoteUserId, ResyncCause, RoleId,
    SyncCause, SyncResult, SyncSide,
};
use std::fmt;
use std::sync::Arc;

use crate::backend::{
    ensure_capabilities, Capability, GroupMembership, PermissionBackend, PresenceProvider,
    RemotePlatform,
};
use crate::error::{GameError, SyncFailure};
use crate::identity::{LinkProvider, LinkedIdentity, Someone};
use crate::sync::{
    policy, ChangeOutcome, Pair, ResyncSummary, SyncAdapter, SyncEngine, SyncPair, SyncTerms,
};

const REQUIRED: &[Capability] = &[Capability::ManageRoles];

/// Permission group, optionally scoped to one server context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupKey {
    pub name: String,
    pub context: Option<String>,
}

impl GroupKey {
    pub fn new(name: impl Into<String>, context: Option<&str>) -> Self {
        Self { name: name.into(), context: context.map(str::to_string) }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.context {
            Some(context) => write!(f, "{}@{context}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoleKey {
    pub guild: GuildId,
    pub role: RoleId,
}

pub struct GroupAdapter {
    permissions: Option<Arc<dyn PermissionBackend>>,
    remote: Arc<dyn RemotePlatform>,
}

impl GroupAdapter {
    pub fn new(
        permissions: Option<Arc<dyn PermissionBackend>>,
        remote: Arc<dyn RemotePlatform>,
    ) -> Self {
        Self { permissions, remote }
    }

    fn backend(&self) -> Result<&dyn PermissionBackend, SyncFailure> {
        self.permissions
            .as_ref()
            .map(|backend| &**backend)
            .ok_or_else(|| GameError::Unavailable("permission").into())
    }
}

fn check_group(group: &GroupKey) -> Result<(), SyncFailure> {
    if group.name.trim().is_empty() {
        return Err(SyncFailure::invalid_config("group name is empty"));
    }
    Ok(())
}

fn check_role(role: RoleKey) -> Result<(), SyncFailure> {
    if role.guild.is_unset() {
        return Err(SyncFailure::invalid_config("guild id is not set"));
    }
    if role.role.is_unset() {
        return Err(SyncFailure::invalid_config("role id is not set"));
    }
    Ok(())
}

#[async_trait]
impl SyncAdapter for GroupAdapter {
    type State = bool;
    type GameKey = GroupKey;
    type RemoteKey = RoleKey;

    fn terms(&self) -> SyncTerms {
        SyncTerms { domain: "groups", game: "group", remote: "role" }
    }

    fn removed_value(&self) -> bool {
        false
    }

    fn states_match(&self, game: &bool, remote: &bool) -> bool {
        game == remote
    }

    fn required_capabilities(&self) -> &'static [Capability] {
        REQUIRED
    }

    async fn get_game(&self, pair: &Pair<Self>, identity: LinkedIdentity) -> Result<bool, SyncFailure> {
        check_group(&pair.game)?;
        let membership = self
            .backend()?
            .has_group(identity.game, &pair.game.name, pair.game.context.as_deref())
            .await?;
        Ok(membership.is_member())
    }

    async fn get_remote(
        &self,
        pair: &Pair<Self>,
        identity: LinkedIdentity,
    ) -> Result<bool, SyncFailure> {
        check_role(pair.remote)?;
        Ok(self.remote.has_role(pair.remote.guild, identity.remote, pair.remote.role).await?)
    }

    async fn apply_game(
        &self,
        pair: &Pair<Self>,
        identity: LinkedIdentity,
        state: &bool,
    ) -> Result<SyncResult, SyncFailure> {
        check_group(&pair.game)?;
        let backend = self.backend()?;
        let group = &pair.game.name;
        let context = pair.game.context.as_deref();

        if *state {
            backend.add_group(identity.game, group, context).await?;
            return Ok(SyncResult::AddedGame);
        }

        // Removing a direct assignment would not revoke an inherited group.
        match backend.has_group(identity.game, group, context).await? {
            GroupMembership::Inherited => Ok(SyncResult::RoleChangeCannotChangeGame),
            GroupMembership::Direct | GroupMembership::None => {
                backend.remove_group(identity.game, group, context).await?;
                Ok(SyncResult::RemovedGame)
            },
        }
    }

    async fn apply_remote(
        &self,
        pair: &Pair<Self>,
        identity: LinkedIdentity,
        state: &bool,
    ) -> Result<SyncResult, SyncFailure> {
        check_role(pair.remote)?;
        let RoleKey { guild, role } = pair.remote;
        ensure_capabilities(self.remote.as_ref(), guild, self.required_capabilities()).await?;
        if *state {
            self.remote.add_role(guild, identity.remote, role).await?;
        } else {
            self.remote.remove_role(guild, identity.remote, role).await?;
        }
        Ok(SyncResult::applied(SyncSide::Remote, *state))
    }
}

/// One pair per configured group ↔ role mapping.
pub fn group_pairs(configs: &[GroupSyncPairConfig]) -> Vec<Pair<GroupAdapter>> {
    configs
        .iter()
        .map(|config| {
            SyncPair::new(
                config.describe(),
                config.settings,
                GroupKey::new(config.group_name.clone(), config.server_context.as_deref()),
                RoleKey { guild: config.guild_id, role: config.role_id },
            )
        })
        .collect()
}

/// Entry points for group ↔ role sync.
pub struct GroupSync {
    engine: Arc<SyncEngine<GroupAdapter>>,
}

impl GroupSync {
    pub fn new(
        adapter: GroupAdapter,
        links: Arc<dyn LinkProvider>,
        presence: Option<Arc<dyn PresenceProvider>>,
        engine_config: &EngineConfig,
        configs: &[GroupSyncPairConfig],
    ) -> Self {
        let engine = Arc::new(SyncEngine::new(adapter, links, presence, engine_config));
        engine.reload(group_pairs(configs));
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<SyncEngine<GroupAdapter>> {
        &self.engine
    }

    pub fn reload(&self, configs: &[GroupSyncPairConfig]) {
        self.engine.reload(group_pairs(configs));
    }

    pub async fn on_role_added(
        &self,
        guild: GuildId,
        role: RoleId,
        user: RemoteUserId,
    ) -> Result<ChangeOutcome, SyncFailure> {
        self.role_changed(RoleKey { guild, role }, user, true).await
    }

    pub async fn on_role_removed(
        &self,
        guild: GuildId,
        role: RoleId,
        user: RemoteUserId,
    ) -> Result<ChangeOutcome, SyncFailure> {
        self.role_changed(RoleKey { guild, role }, user, false).await
    }

    pub async fn on_group_added(
        &self,
        player: GameId,
        group: &str,
        context: Option<&str>,
    ) -> Result<ChangeOutcome, SyncFailure> {
        self.group_changed(GroupKey::new(group, context), player, true).await
    }

    pub async fn on_group_removed(
        &self,
        player: GameId,
        group: &str,
        context: Option<&str>,
    ) -> Result<ChangeOutcome, SyncFailure> {
        self.group_changed(GroupKey::new(group, context), player, false).await
    }

    pub async fn on_game_join(&self, player: GameId) -> ResyncSummary {
        self.engine.resync_all(ResyncCause::GameJoin, Someone::Game(player), policy::configured).await
    }

    pub async fn on_link(&self, identity: LinkedIdentity) -> ResyncSummary {
        self.engine.resync_all(ResyncCause::Link, identity.into(), policy::configured).await
    }

    pub async fn resync(&self, someone: Someone) -> ResyncSummary {
        self.engine.resync_all(ResyncCause::Command, someone, policy::configured).await
    }

    pub fn shutdown(&self) {
        self.engine.shutdown();
    }

    async fn role_changed(
        &self,
        key: RoleKey,
        user: RemoteUserId,
        present: bool,
    ) -> Result<ChangeOutcome, SyncFailure> {
        self.engine
            .notify_remote_changed(SyncCause::RemoteChange, Someone::Remote(user), &key, present)
            .await
    }

    async fn group_changed(
        &self,
        key: GroupKey,
        player: GameId,
        present: bool,
    ) -> Result<ChangeOutcome, SyncFailure> {
        self.engine
            .notify_game_changed(SyncCause::GameChange, Someone::Game(player), &key, present)
            .await
    }
}
