//! Per-pair sync settings: direction, tie-breakers and timer.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::direction::{ResyncCause, SyncDirection, SyncSide};

/// Authoritative side per resync cause.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TieBreakers {
    /// Used when a player joins the game server
    #[serde(default = "default_side")]
    pub join: SyncSide,
    /// Used when a new account link is established
    #[serde(default = "default_side")]
    pub link: SyncSide,
    /// Used by the manual resync command
    #[serde(default = "default_side")]
    pub command: SyncSide,
    /// Used by the periodic timer
    #[serde(default = "default_side")]
    pub timer: SyncSide,
}

impl Default for TieBreakers {
    fn default() -> Self {
        Self::all(default_side())
    }
}

impl TieBreakers {
    /// Same side for every cause.
    pub const fn all(side: SyncSide) -> Self {
        Self { join: side, link: side, command: side, timer: side }
    }

    pub const fn for_cause(&self, cause: ResyncCause) -> SyncSide {
        match cause {
            ResyncCause::GameJoin => self.join,
            ResyncCause::Link => self.link,
            ResyncCause::Command => self.command,
            ResyncCause::Timer => self.timer,
        }
    }

    /// Copy with the tie-breaker for `cause` replaced.
    pub fn with(mut self, cause: ResyncCause, side: SyncSide) -> Self {
        match cause {
            ResyncCause::GameJoin => self.join = side,
            ResyncCause::Link => self.link = side,
            ResyncCause::Command => self.command = side,
            ResyncCause::Timer => self.timer = side,
        }
        self
    }

    fn entries_mut(&mut self) -> [(ResyncCause, &mut SyncSide); 4] {
        [
            (ResyncCause::GameJoin, &mut self.join),
            (ResyncCause::Link, &mut self.link),
            (ResyncCause::Command, &mut self.command),
            (ResyncCause::Timer, &mut self.timer),
        ]
    }
}

/// Periodic resync timer for one pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct TimerConfig {
    /// Enable the timer
    #[serde(default)]
    pub enabled: bool,
    /// Cycle time in minutes
    #[validate(range(min = 1_u32, max = 10080_u32))]
    #[serde(default = "default_cycle_minutes")]
    pub cycle_minutes: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self { enabled: false, cycle_minutes: default_cycle_minutes() }
    }
}

/// A tie-breaker entry that contradicted its pair's direction and was rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TieBreakerCorrection {
    pub cause: ResyncCause,
    pub configured: SyncSide,
    pub corrected: SyncSide,
}

/// Behaviour of one sync pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct SyncSettings {
    /// Which sides may be written
    #[serde(default)]
    pub direction: SyncDirection,
    /// Authoritative side per resync cause
    #[serde(default)]
    pub tie_breakers: TieBreakers,
    /// Periodic resync
    #[validate(nested)]
    #[serde(default)]
    pub timer: TimerConfig,
}

impl SyncSettings {
    pub fn new(direction: SyncDirection, tie_breakers: TieBreakers) -> Self {
        Self { direction, tie_breakers, timer: TimerConfig::default() }
    }

    /// Rewrite tie-breakers that a unidirectional direction can never honour.
    ///
    /// A `GameToRemote` pair with a `Remote` tie-breaker would always resolve
    /// to `WrongDirection` and never converge, so every such entry is replaced
    /// with the direction's implied authority. Returns the corrections made.
    pub fn normalize(&mut self) -> Vec<TieBreakerCorrection> {
        let Some(authority) = self.direction.implied_authority() else {
            return Vec::new();
        };

        let mut corrections = Vec::new();
        for (cause, side) in self.tie_breakers.entries_mut() {
            if *side != authority {
                corrections.push(TieBreakerCorrection {
                    cause,
                    configured: *side,
                    corrected: authority,
                });
                *side = authority;
            }
        }
        corrections
    }
}

const fn default_side() -> SyncSide {
    SyncSide::Game
}

const fn default_cycle_minutes() -> u32 {
    5
}
