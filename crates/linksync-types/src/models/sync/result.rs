//! Outcome of a single reconciliation attempt.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How an outcome should be treated by callers and logs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ResultCategory {
    /// A write happened or nothing needed to change
    Success,
    /// Nothing was written, and that is expected
    Skipped,
    /// The attempt was abandoned
    Failure,
}

/// Tagged outcome of one reconciliation attempt.
///
/// Produced once per attempt and never retried automatically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SyncResult {
    /// Value applied to the game side
    AddedGame,
    /// Value removed from the game side
    RemovedGame,
    /// Value applied to the remote side
    AddedRemote,
    /// Value removed from the remote side
    RemovedRemote,
    /// Both sides already agree
    AlreadyInSync,

    /// Identity has no link on the other system
    NotLinked,
    /// The pair's direction forbids writing the side that differs
    WrongDirection,
    /// A role change cannot affect the game side in this context
    RoleChangeCannotChangeGame,

    /// Configured guild does not exist or is unavailable
    GuildMissing,
    /// Configured role does not exist
    RoleMissing,
    /// Role is above the integration's highest role or managed
    RoleNotInteractable,
    /// User is not a member of the guild
    NotAMember,
    /// No game-side backend is registered for this domain
    NoIntegration,
    /// Integration lacks a required remote permission
    PermissionDenied,
    /// Pair configuration is unusable
    InvalidConfig,
    /// Punishment cannot be represented on the remote side
    PunishmentTooLong,
    /// Backend or network error; self-heals on the next trigger
    BackendError,
}

impl SyncResult {
    pub const fn category(self) -> ResultCategory {
        match self {
            Self::AddedGame
            | Self::RemovedGame
            | Self::AddedRemote
            | Self::RemovedRemote
            | Self::AlreadyInSync => ResultCategory::Success,
            Self::NotLinked | Self::WrongDirection | Self::RoleChangeCannotChangeGame => {
                ResultCategory::Skipped
            },
            Self::GuildMissing
            | Self::RoleMissing
            | Self::RoleNotInteractable
            | Self::NotAMember
            | Self::NoIntegration
            | Self::PermissionDenied
            | Self::InvalidConfig
            | Self::PunishmentTooLong
            | Self::BackendError => ResultCategory::Failure,
        }
    }

    /// Whether a write was issued.
    pub const fn is_change(self) -> bool {
        matches!(self, Self::AddedGame | Self::RemovedGame | Self::AddedRemote | Self::RemovedRemote)
    }

    pub const fn is_success(self) -> bool {
        matches!(self.category(), ResultCategory::Success)
    }

    /// Check if this failure may resolve without operator action.
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::BackendError)
    }

    /// Result describing a write of `present` to `side`.
    pub const fn applied(side: super::SyncSide, present: bool) -> Self {
        match (side, present) {
            (super::SyncSide::Game, true) => Self::AddedGame,
            (super::SyncSide::Game, false) => Self::RemovedGame,
            (super::SyncSide::Remote, true) => Self::AddedRemote,
            (super::SyncSide::Remote, false) => Self::RemovedRemote,
        }
    }

    pub const fn describe(self) -> &'static str {
        match self {
            Self::AddedGame => "added on game side",
            Self::RemovedGame => "removed on game side",
            Self::AddedRemote => "added on remote side",
            Self::RemovedRemote => "removed on remote side",
            Self::AlreadyInSync => "already in sync",
            Self::NotLinked => "account not linked",
            Self::WrongDirection => "direction does not allow this change",
            Self::RoleChangeCannotChangeGame => "role change cannot change game state",
            Self::GuildMissing => "guild missing",
            Self::RoleMissing => "role missing",
            Self::RoleNotInteractable => "role not interactable",
            Self::NotAMember => "user is not a guild member",
            Self::NoIntegration => "no game-side integration available",
            Self::PermissionDenied => "missing remote permission",
            Self::InvalidConfig => "invalid configuration",
            Self::PunishmentTooLong => "punishment too long for remote side",
            Self::BackendError => "backend error",
        }
    }
}

impl fmt::Display for SyncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}
