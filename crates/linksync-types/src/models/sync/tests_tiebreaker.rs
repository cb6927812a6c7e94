use super::*;

#[test]
fn test_tie_breaker_lookup_per_cause() {
    let tie_breakers = TieBreakers::all(SyncSide::Game).with(ResyncCause::GameJoin, SyncSide::Remote);

    assert_eq!(tie_breakers.for_cause(ResyncCause::GameJoin), SyncSide::Remote);
    assert_eq!(tie_breakers.for_cause(ResyncCause::Link), SyncSide::Game);
    assert_eq!(tie_breakers.for_cause(ResyncCause::Command), SyncSide::Game);
    assert_eq!(tie_breakers.for_cause(ResyncCause::Timer), SyncSide::Game);
}

#[test]
fn test_normalize_corrects_contradicting_tie_breaker() {
    let mut settings = SyncSettings::new(
        SyncDirection::GameToRemote,
        TieBreakers::all(SyncSide::Game).with(ResyncCause::Command, SyncSide::Remote),
    );

    let corrections = settings.normalize();

    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections.first().unwrap().cause, ResyncCause::Command);
    assert_eq!(corrections.first().unwrap().configured, SyncSide::Remote);
    assert_eq!(corrections.first().unwrap().corrected, SyncSide::Game);
    assert_eq!(settings.tie_breakers, TieBreakers::all(SyncSide::Game));
}

#[test]
fn test_normalize_remote_to_game_rewrites_all() {
    let mut settings =
        SyncSettings::new(SyncDirection::RemoteToGame, TieBreakers::all(SyncSide::Game));

    let corrections = settings.normalize();

    assert_eq!(corrections.len(), 4);
    assert_eq!(settings.tie_breakers, TieBreakers::all(SyncSide::Remote));
}

#[test]
fn test_normalize_leaves_bidirectional_untouched() {
    let original = TieBreakers::all(SyncSide::Game).with(ResyncCause::Timer, SyncSide::Remote);
    let mut settings = SyncSettings::new(SyncDirection::Bidirectional, original);

    assert!(settings.normalize().is_empty());
    assert_eq!(settings.tie_breakers, original);
}

#[test]
fn test_normalize_is_idempotent() {
    let mut settings =
        SyncSettings::new(SyncDirection::GameToRemote, TieBreakers::all(SyncSide::Remote));

    assert_eq!(settings.normalize().len(), 4);
    assert!(settings.normalize().is_empty());
}
