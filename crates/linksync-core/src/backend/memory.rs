//! In-process backends.
//!
//! Used by tests and by `linksync simulate`. Every write bumps a counter so
//! callers can assert that an in-sync reconciliation touched nothing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use linksync_types::{GameId, GuildId, Punishment, RemoteUserId, RoleId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{
    Capability, GroupMembership, PermissionBackend, PresenceProvider, PunishmentBackend,
    PunishmentType, RemotePlatform,
};
use crate::error::{GameError, LinkError, RemoteError};
use crate::identity::LinkProvider;

/// Link store backed by two maps.
#[derive(Default)]
pub struct MemoryLinks {
    by_game: DashMap<GameId, RemoteUserId>,
    by_remote: DashMap<RemoteUserId, GameId>,
}

impl MemoryLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(&self, game: GameId, remote: RemoteUserId) {
        self.by_game.insert(game, remote);
        self.by_remote.insert(remote, game);
    }

    pub fn unlink(&self, game: GameId) {
        if let Some((_, remote)) = self.by_game.remove(&game) {
            self.by_remote.remove(&remote);
        }
    }
}

#[async_trait]
impl LinkProvider for MemoryLinks {
    async fn remote_id_for(&self, game: GameId) -> Result<Option<RemoteUserId>, LinkError> {
        Ok(self.by_game.get(&game).map(|r| *r))
    }

    async fn game_id_for(&self, remote: RemoteUserId) -> Result<Option<GameId>, LinkError> {
        Ok(self.by_remote.get(&remote).map(|g| *g))
    }
}

#[derive(Default)]
struct GuildState {
    capabilities: HashSet<Capability>,
    roles: HashSet<RoleId>,
    members: HashSet<RemoteUserId>,
    bans: HashMap<RemoteUserId, Punishment>,
    timeouts: HashMap<RemoteUserId, DateTime<Utc>>,
    member_roles: HashSet<(RemoteUserId, RoleId)>,
}

/// Remote platform with guilds, roles, bans and timeouts held in memory.
#[derive(Default)]
pub struct MemoryRemote {
    guilds: Mutex<HashMap<GuildId, GuildState>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a guild the integration can see, holding `capabilities`.
    pub fn add_guild(&self, guild: GuildId, capabilities: &[Capability]) {
        let mut guilds = self.guilds.lock();
        let state = guilds.entry(guild).or_default();
        state.capabilities.extend(capabilities.iter().copied());
    }

    pub fn add_role_definition(&self, guild: GuildId, role: RoleId) {
        self.guilds.lock().entry(guild).or_default().roles.insert(role);
    }

    pub fn add_member(&self, guild: GuildId, user: RemoteUserId) {
        self.guilds.lock().entry(guild).or_default().members.insert(user);
    }

    /// Seed a ban without counting it as a write.
    pub fn seed_ban(&self, guild: GuildId, user: RemoteUserId, punishment: Punishment) {
        self.guilds.lock().entry(guild).or_default().bans.insert(user, punishment);
    }

    pub fn seed_timeout(&self, guild: GuildId, user: RemoteUserId, until: DateTime<Utc>) {
        self.guilds.lock().entry(guild).or_default().timeouts.insert(user, until);
    }

    pub fn seed_role(&self, guild: GuildId, user: RemoteUserId, role: RoleId) {
        self.guilds.lock().entry(guild).or_default().member_roles.insert((user, role));
    }

    pub fn ban_of(&self, guild: GuildId, user: RemoteUserId) -> Option<Punishment> {
        self.guilds.lock().get(&guild).and_then(|g| g.bans.get(&user).cloned())
    }

    pub fn timeout_of(&self, guild: GuildId, user: RemoteUserId) -> Option<DateTime<Utc>> {
        self.guilds.lock().get(&guild).and_then(|g| g.timeouts.get(&user).copied())
    }

    pub fn holds_role(&self, guild: GuildId, user: RemoteUserId, role: RoleId) -> bool {
        self.guilds.lock().get(&guild).is_some_and(|g| g.member_roles.contains(&(user, role)))
    }

    /// Number of write calls received.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every call fail with a request error until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), RemoteError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RemoteError::Request("simulated outage".to_string()));
        }
        Ok(())
    }

    fn with_guild<T>(
        &self,
        guild: GuildId,
        f: impl FnOnce(&mut GuildState) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        self.check_available()?;
        let mut guilds = self.guilds.lock();
        let state = guilds.get_mut(&guild).ok_or(RemoteError::GuildMissing(guild))?;
        f(state)
    }

    fn write<T>(
        &self,
        guild: GuildId,
        f: impl FnOnce(&mut GuildState) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let result = self.with_guild(guild, f);
        if result.is_ok() {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}

fn require_member(state: &GuildState, user: RemoteUserId) -> Result<(), RemoteError> {
    if state.members.contains(&user) {
        Ok(())
    } else {
        Err(RemoteError::NotAMember(user))
    }
}

fn require_role(state: &GuildState, role: RoleId) -> Result<(), RemoteError> {
    if state.roles.contains(&role) {
        Ok(())
    } else {
        Err(RemoteError::RoleMissing(role))
    }
}

#[async_trait]
impl RemotePlatform for MemoryRemote {
    async fn capabilities(&self, guild: GuildId) -> Result<HashSet<Capability>, RemoteError> {
        self.with_guild(guild, |state| Ok(state.capabilities.clone()))
    }

    async fn get_ban(
        &self,
        guild: GuildId,
        user: RemoteUserId,
    ) -> Result<Option<Punishment>, RemoteError> {
        self.with_guild(guild, |state| Ok(state.bans.get(&user).cloned()))
    }

    async fn ban(
        &self,
        guild: GuildId,
        user: RemoteUserId,
        reason: Option<&str>,
    ) -> Result<(), RemoteError> {
        self.write(guild, |state| {
            let punishment = Punishment { reason: reason.map(str::to_string), ..Punishment::permanent() };
            state.bans.insert(user, punishment);
            state.members.remove(&user);
            Ok(())
        })
    }

    async fn unban(&self, guild: GuildId, user: RemoteUserId) -> Result<(), RemoteError> {
        self.write(guild, |state| {
            state.bans.remove(&user);
            Ok(())
        })
    }

    async fn get_timeout(
        &self,
        guild: GuildId,
        user: RemoteUserId,
    ) -> Result<Option<DateTime<Utc>>, RemoteError> {
        self.with_guild(guild, |state| {
            require_member(state, user)?;
            Ok(state.timeouts.get(&user).copied())
        })
    }

    async fn set_timeout(
        &self,
        guild: GuildId,
        user: RemoteUserId,
        until: DateTime<Utc>,
        _reason: Option<&str>,
    ) -> Result<(), RemoteError> {
        self.write(guild, |state| {
            require_member(state, user)?;
            state.timeouts.insert(user, until);
            Ok(())
        })
    }

    async fn remove_timeout(&self, guild: GuildId, user: RemoteUserId) -> Result<(), RemoteError> {
        self.write(guild, |state| {
            require_member(state, user)?;
            state.timeouts.remove(&user);
            Ok(())
        })
    }

    async fn has_role(
        &self,
        guild: GuildId,
        user: RemoteUserId,
        role: RoleId,
    ) -> Result<bool, RemoteError> {
        self.with_guild(guild, |state| {
            require_role(state, role)?;
            require_member(state, user)?;
            Ok(state.member_roles.contains(&(user, role)))
        })
    }

    async fn add_role(
        &self,
        guild: GuildId,
        user: RemoteUserId,
        role: RoleId,
    ) -> Result<(), RemoteError> {
        self.write(guild, |state| {
            require_role(state, role)?;
            require_member(state, user)?;
            state.member_roles.insert((user, role));
            Ok(())
        })
    }

    async fn remove_role(
        &self,
        guild: GuildId,
        user: RemoteUserId,
        role: RoleId,
    ) -> Result<(), RemoteError> {
        self.write(guild, |state| {
            require_role(state, role)?;
            require_member(state, user)?;
            state.member_roles.remove(&(user, role));
            Ok(())
        })
    }
}

type GroupEntry = (String, Option<String>);

/// Game server with punishments and permission groups held in memory.
#[derive(Default)]
pub struct MemoryGame {
    punishments: Mutex<HashMap<(PunishmentType, GameId), Punishment>>,
    groups: Mutex<HashMap<GameId, HashSet<GroupEntry>>>,
    inherited: Mutex<HashMap<GameId, HashSet<GroupEntry>>>,
    writes: AtomicUsize,
}

impl MemoryGame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_punishment(&self, kind: PunishmentType, player: GameId, punishment: Punishment) {
        self.punishments.lock().insert((kind, player), punishment);
    }

    pub fn seed_group(&self, player: GameId, group: &str, context: Option<&str>) {
        self.groups.lock().entry(player).or_default().insert(entry(group, context));
    }

    /// Grant a group through inheritance only.
    pub fn seed_inherited_group(&self, player: GameId, group: &str, context: Option<&str>) {
        self.inherited.lock().entry(player).or_default().insert(entry(group, context));
    }

    pub fn punishment_of(&self, kind: PunishmentType, player: GameId) -> Option<Punishment> {
        self.punishments.lock().get(&(kind, player)).cloned()
    }

    pub fn in_group(&self, player: GameId, group: &str, context: Option<&str>) -> bool {
        self.groups.lock().get(&player).is_some_and(|g| g.contains(&entry(group, context)))
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn entry(group: &str, context: Option<&str>) -> GroupEntry {
    (group.to_string(), context.map(str::to_string))
}

#[async_trait]
impl PunishmentBackend for MemoryGame {
    async fn get_punishment(
        &self,
        kind: PunishmentType,
        player: GameId,
    ) -> Result<Option<Punishment>, GameError> {
        Ok(self.punishment_of(kind, player))
    }

    async fn add_punishment(
        &self,
        kind: PunishmentType,
        player: GameId,
        punishment: &Punishment,
    ) -> Result<(), GameError> {
        self.punishments.lock().insert((kind, player), punishment.clone());
        self.record_write();
        Ok(())
    }

    async fn remove_punishment(
        &self,
        kind: PunishmentType,
        player: GameId,
    ) -> Result<(), GameError> {
        self.punishments.lock().remove(&(kind, player));
        self.record_write();
        Ok(())
    }
}

#[async_trait]
impl PermissionBackend for MemoryGame {
    async fn has_group(
        &self,
        player: GameId,
        group: &str,
        context: Option<&str>,
    ) -> Result<GroupMembership, GameError> {
        let key = entry(group, context);
        if self.groups.lock().get(&player).is_some_and(|g| g.contains(&key)) {
            return Ok(GroupMembership::Direct);
        }
        if self.inherited.lock().get(&player).is_some_and(|g| g.contains(&key)) {
            return Ok(GroupMembership::Inherited);
        }
        Ok(GroupMembership::None)
    }

    async fn add_group(
        &self,
        player: GameId,
        group: &str,
        context: Option<&str>,
    ) -> Result<(), GameError> {
        self.groups.lock().entry(player).or_default().insert(entry(group, context));
        self.record_write();
        Ok(())
    }

    async fn remove_group(
        &self,
        player: GameId,
        group: &str,
        context: Option<&str>,
    ) -> Result<(), GameError> {
        if let Some(groups) = self.groups.lock().get_mut(&player) {
            groups.remove(&entry(group, context));
        }
        self.record_write();
        Ok(())
    }
}

/// Fixed list of online players.
#[derive(Default)]
pub struct MemoryPresence {
    online: Mutex<Vec<GameId>>,
}

impl MemoryPresence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&self, players: Vec<GameId>) {
        *self.online.lock() = players;
    }
}

#[async_trait]
impl PresenceProvider for MemoryPresence {
    async fn online_players(&self) -> Vec<GameId> {
        self.online.lock().clone()
    }
}
