//! Boundaries to the systems of record.
//!
//! The engine never talks to a gateway, REST client, or plugin API directly.
//! It reaches them through these traits; production hosts implement them over
//! their real clients and [`memory`] provides in-process implementations.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use linksync_types::{GameId, GuildId, Punishment, RemoteUserId, RoleId};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{GameError, RemoteError};
use crate::identity::LinkProvider;

/// Remote-platform permission an adapter needs to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    BanMembers,
    ModerateMembers,
    ManageRoles,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::BanMembers => write!(f, "BAN_MEMBERS"),
            Self::ModerateMembers => write!(f, "MODERATE_MEMBERS"),
            Self::ManageRoles => write!(f, "MANAGE_ROLES"),
        }
    }
}

/// Game punishment category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PunishmentType {
    Ban,
    Mute,
}

/// How a player holds a permission group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMembership {
    None,
    /// Assigned to the player
    Direct,
    /// Only held through a parent group or default
    Inherited,
}

impl GroupMembership {
    pub const fn is_member(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// Remote chat-platform client.
#[async_trait]
pub trait RemotePlatform: Send + Sync {
    async fn capabilities(&self, guild: GuildId) -> Result<HashSet<Capability>, RemoteError>;

    async fn get_ban(
        &self,
        guild: GuildId,
        user: RemoteUserId,
    ) -> Result<Option<Punishment>, RemoteError>;
    async fn ban(
        &self,
        guild: GuildId,
        user: RemoteUserId,
        reason: Option<&str>,
    ) -> Result<(), RemoteError>;
    async fn unban(&self, guild: GuildId, user: RemoteUserId) -> Result<(), RemoteError>;

    /// Current timeout expiry; `NotAMember` if the user left the guild.
    async fn get_timeout(
        &self,
        guild: GuildId,
        user: RemoteUserId,
    ) -> Result<Option<DateTime<Utc>>, RemoteError>;
    async fn set_timeout(
        &self,
        guild: GuildId,
        user: RemoteUserId,
        until: DateTime<Utc>,
        reason: Option<&str>,
    ) -> Result<(), RemoteError>;
    async fn remove_timeout(&self, guild: GuildId, user: RemoteUserId) -> Result<(), RemoteError>;

    async fn has_role(
        &self,
        guild: GuildId,
        user: RemoteUserId,
        role: RoleId,
    ) -> Result<bool, RemoteError>;
    async fn add_role(
        &self,
        guild: GuildId,
        user: RemoteUserId,
        role: RoleId,
    ) -> Result<(), RemoteError>;
    async fn remove_role(
        &self,
        guild: GuildId,
        user: RemoteUserId,
        role: RoleId,
    ) -> Result<(), RemoteError>;
}

/// Game-side ban and mute storage.
#[async_trait]
pub trait PunishmentBackend: Send + Sync {
    async fn get_punishment(
        &self,
        kind: PunishmentType,
        player: GameId,
    ) -> Result<Option<Punishment>, GameError>;
    async fn add_punishment(
        &self,
        kind: PunishmentType,
        player: GameId,
        punishment: &Punishment,
    ) -> Result<(), GameError>;
    async fn remove_punishment(&self, kind: PunishmentType, player: GameId)
        -> Result<(), GameError>;
}

/// Game-side permission groups.
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    async fn has_group(
        &self,
        player: GameId,
        group: &str,
        context: Option<&str>,
    ) -> Result<GroupMembership, GameError>;
    async fn add_group(
        &self,
        player: GameId,
        group: &str,
        context: Option<&str>,
    ) -> Result<(), GameError>;
    async fn remove_group(
        &self,
        player: GameId,
        group: &str,
        context: Option<&str>,
    ) -> Result<(), GameError>;
}

/// Source of online players for timer resyncs.
#[async_trait]
pub trait PresenceProvider: Send + Sync {
    async fn online_players(&self) -> Vec<GameId>;
}

/// Everything a host plugs into the engine.
#[derive(Clone)]
pub struct Backends {
    pub links: Arc<dyn LinkProvider>,
    pub remote: Arc<dyn RemotePlatform>,
    /// `None` when no punishment plugin is installed
    pub punishments: Option<Arc<dyn PunishmentBackend>>,
    /// `None` when no permission plugin is installed
    pub permissions: Option<Arc<dyn PermissionBackend>>,
    pub presence: Option<Arc<dyn PresenceProvider>>,
}

/// Fail with `PermissionDenied` unless the integration holds every capability.
pub async fn ensure_capabilities(
    remote: &dyn RemotePlatform,
    guild: GuildId,
    required: &[Capability],
) -> Result<(), RemoteError> {
    let granted = remote.capabilities(guild).await?;
    match required.iter().find(|cap| !granted.contains(*cap)) {
        Some(missing) => Err(RemoteError::MissingPermission(*missing)),
        None => Ok(()),
    }
}
