//! Identity resolution.
//!
//! Notifications usually know only one side of an account. [`Someone`] carries
//! whatever is known and resolves lazily against the link store.

use async_trait::async_trait;
use linksync_types::{GameId, RemoteUserId};
use std::fmt;

use crate::error::LinkError;

/// Account-link store.
#[async_trait]
pub trait LinkProvider: Send + Sync {
    async fn remote_id_for(&self, game: GameId) -> Result<Option<RemoteUserId>, LinkError>;
    async fn game_id_for(&self, remote: RemoteUserId) -> Result<Option<GameId>, LinkError>;
}

/// Both ids of a linked account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkedIdentity {
    pub game: GameId,
    pub remote: RemoteUserId,
}

impl LinkedIdentity {
    pub const fn new(game: GameId, remote: RemoteUserId) -> Self {
        Self { game, remote }
    }
}

impl fmt::Display for LinkedIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.game, self.remote)
    }
}

/// A one-sided or resolved account reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Someone {
    Game(GameId),
    Remote(RemoteUserId),
    Linked(LinkedIdentity),
}

impl Someone {
    pub const fn game_id(&self) -> Option<GameId> {
        match self {
            Self::Game(id) => Some(*id),
            Self::Linked(identity) => Some(identity.game),
            Self::Remote(_) => None,
        }
    }

    pub const fn remote_id(&self) -> Option<RemoteUserId> {
        match self {
            Self::Remote(id) => Some(*id),
            Self::Linked(identity) => Some(identity.remote),
            Self::Game(_) => None,
        }
    }

    /// Resolve both sides; `Ok(None)` when the account is not linked.
    pub async fn resolve(
        &self,
        links: &dyn LinkProvider,
    ) -> Result<Option<LinkedIdentity>, LinkError> {
        match *self {
            Self::Linked(identity) => Ok(Some(identity)),
            Self::Game(game) => Ok(links
                .remote_id_for(game)
                .await?
                .map(|remote| LinkedIdentity::new(game, remote))),
            Self::Remote(remote) => Ok(links
                .game_id_for(remote)
                .await?
                .map(|game| LinkedIdentity::new(game, remote))),
        }
    }
}

impl From<LinkedIdentity> for Someone {
    fn from(identity: LinkedIdentity) -> Self {
        Self::Linked(identity)
    }
}

impl fmt::Display for Someone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Game(id) => write!(f, "game:{id}"),
            Self::Remote(id) => write!(f, "remote:{id}"),
            Self::Linked(identity) => identity.fmt(f),
        }
    }
}
