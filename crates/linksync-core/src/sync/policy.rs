//! Tie-break and direction policy. Pure, no I/O.

use linksync_types::{
    ResyncCause, SyncCause, SyncDirection, SyncSettings, SyncSide, TieBreakerCorrection,
    TieBreakers,
};

/// Which side wins a disagreement and whether the loser may be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub authority: SyncSide,
    pub allowed: bool,
}

impl Decision {
    /// Side that would be written.
    pub const fn target(&self) -> SyncSide {
        self.authority.opposite()
    }
}

/// Authoritative side for `cause`.
///
/// Change causes make the side that changed authoritative; resync causes use
/// the configured tie-breaker.
pub const fn authority_for(tie_breakers: &TieBreakers, cause: SyncCause) -> SyncSide {
    match cause {
        SyncCause::GameChange => SyncSide::Game,
        SyncCause::RemoteChange => SyncSide::Remote,
        SyncCause::GameJoin => tie_breakers.join,
        SyncCause::Link => tie_breakers.link,
        SyncCause::Command => tie_breakers.command,
        SyncCause::Timer => tie_breakers.timer,
    }
}

pub const fn decide(
    direction: SyncDirection,
    tie_breakers: &TieBreakers,
    cause: SyncCause,
) -> Decision {
    let authority = authority_for(tie_breakers, cause);
    Decision { authority, allowed: direction.permits_write_to(authority.opposite()) }
}

/// Override that keeps the configured tie-breaker.
pub const fn configured(_cause: ResyncCause, side: SyncSide) -> SyncSide {
    side
}

/// Tie-breakers after applying a resync override.
///
/// An override is clamped to the direction's implied authority so it can
/// never produce a table that does not converge.
pub fn effective_tie_breakers<F>(settings: &SyncSettings, cause: ResyncCause, over: &F) -> TieBreakers
where
    F: Fn(ResyncCause, SyncSide) -> SyncSide + ?Sized,
{
    let configured = settings.tie_breakers.for_cause(cause);
    let side = match settings.direction.implied_authority() {
        Some(authority) => authority,
        None => over(cause, configured),
    };
    settings.tie_breakers.with(cause, side)
}

/// Correct contradicting tie-breakers in place, logging each correction.
pub fn normalize_settings(settings: &mut SyncSettings, pair: &str) -> Vec<TieBreakerCorrection> {
    let corrections = settings.normalize();
    for correction in &corrections {
        tracing::warn!(
            pair = %pair,
            direction = %settings.direction,
            "[SyncPolicy] {:?} tie-breaker {} contradicts direction, using {}",
            correction.cause,
            correction.configured,
            correction.corrected
        );
    }
    corrections
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resync_cause_uses_tie_breaker() {
        let tb = TieBreakers::all(SyncSide::Game).with(ResyncCause::Command, SyncSide::Remote);

        let decision = decide(SyncDirection::Bidirectional, &tb, SyncCause::Command);
        assert_eq!(decision, Decision { authority: SyncSide::Remote, allowed: true });
        assert_eq!(decision.target(), SyncSide::Game);

        let decision = decide(SyncDirection::Bidirectional, &tb, SyncCause::Timer);
        assert_eq!(decision.authority, SyncSide::Game);
    }

    #[test]
    fn test_change_cause_makes_changed_side_authoritative() {
        let tb = TieBreakers::all(SyncSide::Game);
        let decision = decide(SyncDirection::Bidirectional, &tb, SyncCause::RemoteChange);
        assert_eq!(decision.authority, SyncSide::Remote);
        assert!(decision.allowed);
    }

    #[test]
    fn test_direction_forbids_write() {
        let tb = TieBreakers::all(SyncSide::Game);
        let decision = decide(SyncDirection::GameToRemote, &tb, SyncCause::RemoteChange);
        assert_eq!(decision.authority, SyncSide::Remote);
        assert!(!decision.allowed);

        let decision = decide(SyncDirection::GameToRemote, &tb, SyncCause::GameChange);
        assert!(decision.allowed);
    }

    #[test]
    fn test_override_applies_only_to_its_cause() {
        let settings = SyncSettings::default();
        let force_remote = |cause: ResyncCause, side: SyncSide| {
            if cause == ResyncCause::GameJoin {
                SyncSide::Remote
            } else {
                side
            }
        };

        let tb = effective_tie_breakers(&settings, ResyncCause::GameJoin, &force_remote);
        assert_eq!(tb.join, SyncSide::Remote);
        assert_eq!(tb.link, SyncSide::Game);
        assert_eq!(settings.tie_breakers.join, SyncSide::Game);
    }

    #[test]
    fn test_override_clamped_to_direction() {
        let settings = SyncSettings::new(SyncDirection::GameToRemote, TieBreakers::all(SyncSide::Game));
        let tb = effective_tie_breakers(&settings, ResyncCause::GameJoin, &|_, _| SyncSide::Remote);
        assert_eq!(tb.join, SyncSide::Game);
    }

    #[test]
    fn test_normalize_settings_reports_corrections() {
        let mut settings = SyncSettings::new(
            SyncDirection::GameToRemote,
            TieBreakers::all(SyncSide::Game).with(ResyncCause::Command, SyncSide::Remote),
        );
        let corrections = normalize_settings(&mut settings, "bans");
        assert_eq!(corrections.len(), 1);
        assert_eq!(settings.tie_breakers.command, SyncSide::Game);
    }
}
