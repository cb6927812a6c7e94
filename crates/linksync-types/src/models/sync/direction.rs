//! Direction, side and cause enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two systems of record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncSide {
    /// In-game authority (punishment / permission backends)
    Game,
    /// Remote chat-platform authority
    Remote,
}

impl SyncSide {
    pub const fn opposite(self) -> Self {
        match self {
            Self::Game => Self::Remote,
            Self::Remote => Self::Game,
        }
    }
}

impl fmt::Display for SyncSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Game => write!(f, "game"),
            Self::Remote => write!(f, "remote"),
        }
    }
}

/// Which sides a pair is allowed to write.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Either side may be written
    #[default]
    Bidirectional,
    /// Game is authoritative; only the remote side is written
    GameToRemote,
    /// Remote is authoritative; only the game side is written
    RemoteToGame,
}

impl SyncDirection {
    /// The only side a unidirectional pair may treat as authoritative.
    pub const fn implied_authority(self) -> Option<SyncSide> {
        match self {
            Self::Bidirectional => None,
            Self::GameToRemote => Some(SyncSide::Game),
            Self::RemoteToGame => Some(SyncSide::Remote),
        }
    }

    /// Whether this direction permits writing to `target`.
    pub const fn permits_write_to(self, target: SyncSide) -> bool {
        match (self, target) {
            (Self::Bidirectional, _) => true,
            (Self::GameToRemote, SyncSide::Remote) => true,
            (Self::RemoteToGame, SyncSide::Game) => true,
            (Self::GameToRemote, SyncSide::Game) | (Self::RemoteToGame, SyncSide::Remote) => false,
        }
    }

    /// Parse from string.
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bidirectional" => Some(Self::Bidirectional),
            "game_to_remote" | "minecraft_to_discord" => Some(Self::GameToRemote),
            "remote_to_game" | "discord_to_minecraft" => Some(Self::RemoteToGame),
            _ => None,
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Bidirectional => write!(f, "bidirectional"),
            Self::GameToRemote => write!(f, "game_to_remote"),
            Self::RemoteToGame => write!(f, "remote_to_game"),
        }
    }
}

/// Causes that look up a configured tie-breaker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResyncCause {
    /// Player joined the game server
    GameJoin,
    /// A new account link was established
    Link,
    /// Operator ran the resync command
    Command,
    /// Periodic per-pair timer
    Timer,
}

/// Why a reconciliation attempt happened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SyncCause {
    /// Player joined the game server
    GameJoin,
    /// A new account link was established
    Link,
    /// Operator ran the resync command
    Command,
    /// Periodic per-pair timer
    Timer,
    /// The game side reported a change
    GameChange,
    /// The remote side reported a change
    RemoteChange,
}

impl SyncCause {
    /// Tie-breaker key for resync causes, `None` for change causes.
    pub const fn resync(self) -> Option<ResyncCause> {
        match self {
            Self::GameJoin => Some(ResyncCause::GameJoin),
            Self::Link => Some(ResyncCause::Link),
            Self::Command => Some(ResyncCause::Command),
            Self::Timer => Some(ResyncCause::Timer),
            Self::GameChange | Self::RemoteChange => None,
        }
    }

    /// Side whose change triggered this attempt, if any.
    pub const fn changed_side(self) -> Option<SyncSide> {
        match self {
            Self::GameChange => Some(SyncSide::Game),
            Self::RemoteChange => Some(SyncSide::Remote),
            Self::GameJoin | Self::Link | Self::Command | Self::Timer => None,
        }
    }
}

impl From<ResyncCause> for SyncCause {
    fn from(cause: ResyncCause) -> Self {
        match cause {
            ResyncCause::GameJoin => Self::GameJoin,
            ResyncCause::Link => Self::Link,
            ResyncCause::Command => Self::Command,
            ResyncCause::Timer => Self::Timer,
        }
    }
}

impl fmt::Display for SyncCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::GameJoin => write!(f, "game join"),
            Self::Link => write!(f, "link"),
            Self::Command => write!(f, "command"),
            Self::Timer => write!(f, "timer"),
            Self::GameChange => write!(f, "game change"),
            Self::RemoteChange => write!(f, "remote change"),
        }
    }
}
