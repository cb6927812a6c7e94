//! Error types for the sync engine.
//!
//! Backends report their own typed errors; they are converted into a
//! [`SyncFailure`] at the adapter boundary so the engine only ever sees one
//! failure type carrying a [`SyncResult`] reason.

use linksync_types::{GuildId, RemoteUserId, RoleId, SyncResult};
use std::error::Error as StdError;
use thiserror::Error;

use crate::backend::Capability;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// A reconciliation attempt that was abandoned.
#[derive(Debug, Error)]
#[error("{reason}: {message}")]
pub struct SyncFailure {
    reason: SyncResult,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl SyncFailure {
    pub fn new(reason: SyncResult, message: impl Into<String>) -> Self {
        Self { reason, message: message.into(), source: None }
    }

    pub fn with_source(
        reason: SyncResult,
        message: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self { reason, message: message.into(), source: Some(source.into()) }
    }

    /// Transient backend failure.
    pub fn backend(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::with_source(SyncResult::BackendError, message, source)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(SyncResult::InvalidConfig, message)
    }

    pub const fn reason(&self) -> SyncResult {
        self.reason
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Errors reported by the remote-platform client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Guild {0} not found")]
    GuildMissing(GuildId),

    #[error("Role {0} not found")]
    RoleMissing(RoleId),

    #[error("Role {0} is managed or above the integration's highest role")]
    RoleNotInteractable(RoleId),

    #[error("User {0} is not a member of the guild")]
    NotAMember(RemoteUserId),

    #[error("Missing permission: {0}")]
    MissingPermission(Capability),

    #[error("Remote request failed: {0}")]
    Request(String),
}

impl From<RemoteError> for SyncFailure {
    fn from(err: RemoteError) -> Self {
        let reason = match &err {
            RemoteError::GuildMissing(_) => SyncResult::GuildMissing,
            RemoteError::RoleMissing(_) => SyncResult::RoleMissing,
            RemoteError::RoleNotInteractable(_) => SyncResult::RoleNotInteractable,
            RemoteError::NotAMember(_) => SyncResult::NotAMember,
            RemoteError::MissingPermission(_) => SyncResult::PermissionDenied,
            RemoteError::Request(_) => SyncResult::BackendError,
        };
        Self::with_source(reason, "remote platform", err)
    }
}

/// Errors reported by game-side backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    /// No backend is registered for this concern
    #[error("No {0} integration available")]
    Unavailable(&'static str),

    #[error("Game backend failed: {0}")]
    Backend(String),
}

impl From<GameError> for SyncFailure {
    fn from(err: GameError) -> Self {
        let reason = match &err {
            GameError::Unavailable(_) => SyncResult::NoIntegration,
            GameError::Backend(_) => SyncResult::BackendError,
        };
        Self::with_source(reason, "game backend", err)
    }
}

/// Errors reported by the account-link store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Link lookup failed: {0}")]
pub struct LinkError(pub String);

impl From<LinkError> for SyncFailure {
    fn from(err: LinkError) -> Self {
        Self::backend("link lookup", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_maps_to_reason() {
        let failure = SyncFailure::from(RemoteError::NotAMember(RemoteUserId(5)));
        assert_eq!(failure.reason(), SyncResult::NotAMember);
        assert!(failure.source().is_some());

        let failure = SyncFailure::from(RemoteError::MissingPermission(Capability::BanMembers));
        assert_eq!(failure.reason(), SyncResult::PermissionDenied);
    }

    #[test]
    fn test_game_error_maps_to_reason() {
        let failure = SyncFailure::from(GameError::Unavailable("permission"));
        assert_eq!(failure.reason(), SyncResult::NoIntegration);
        assert!(!failure.reason().is_transient());

        let failure = SyncFailure::from(GameError::Backend("timeout".into()));
        assert!(failure.reason().is_transient());
    }

    #[test]
    fn test_display_includes_reason_and_message() {
        let failure = SyncFailure::invalid_config("role id is zero");
        assert_eq!(failure.to_string(), "invalid configuration: role id is zero");
    }
}
