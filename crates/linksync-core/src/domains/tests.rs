use super::*;
use crate::backend::memory::{MemoryGame, MemoryLinks, MemoryRemote};
use crate::backend::{Capability, PermissionBackend, PunishmentBackend, PunishmentType};
use crate::identity::{LinkedIdentity, Someone};
use crate::sync::{CommitTrigger, SyncAdapter};
use chrono::{Duration as ChronoDuration, Utc};
use linksync_types::{
    EngineConfig, GameId, GroupSyncPairConfig, GuildId, Punishment, PunishmentSyncConfig,
    RemoteUserId, RoleId, SyncDirection, SyncResult, SyncSettings, SyncSide, TieBreakers,
};
use std::sync::Arc;
use std::time::Duration;

const GUILD: GuildId = GuildId(10);
const ROLE: RoleId = RoleId(77);

struct Harness {
    links: Arc<MemoryLinks>,
    remote: Arc<MemoryRemote>,
    game: Arc<MemoryGame>,
    identity: LinkedIdentity,
}

impl Harness {
    fn new() -> Self {
        let links = Arc::new(MemoryLinks::new());
        let remote = Arc::new(MemoryRemote::new());
        let game = Arc::new(MemoryGame::new());
        let identity = LinkedIdentity::new(GameId::random(), RemoteUserId(500));

        remote.add_guild(
            GUILD,
            &[Capability::BanMembers, Capability::ModerateMembers, Capability::ManageRoles],
        );
        remote.add_role_definition(GUILD, ROLE);
        remote.add_member(GUILD, identity.remote);
        links.link(identity.game, identity.remote);

        Self { links, remote, game, identity }
    }

    fn punishment_config(settings: SyncSettings) -> PunishmentSyncConfig {
        PunishmentSyncConfig {
            enabled: true,
            guild_id: GUILD,
            remote_wins_on_first_join: true,
            settings,
        }
    }

    fn punishments(&self) -> Option<Arc<dyn PunishmentBackend>> {
        Some(Arc::clone(&self.game) as Arc<dyn PunishmentBackend>)
    }

    fn bans(&self, settings: SyncSettings) -> Arc<PunishmentSync<BanAdapter>> {
        PunishmentSync::new(
            BanAdapter::new(self.punishments(), self.remote.clone()),
            self.links.clone(),
            None,
            &EngineConfig::default(),
            &Self::punishment_config(settings),
        )
    }

    fn mutes(&self) -> Arc<PunishmentSync<MuteAdapter>> {
        PunishmentSync::new(
            MuteAdapter::new(self.punishments(), self.remote.clone()),
            self.links.clone(),
            None,
            &EngineConfig::default(),
            &Self::punishment_config(SyncSettings::default()),
        )
    }

    fn groups(&self, pairs: &[GroupSyncPairConfig]) -> GroupSync {
        let permissions = Some(Arc::clone(&self.game) as Arc<dyn PermissionBackend>);
        GroupSync::new(
            GroupAdapter::new(permissions, self.remote.clone()),
            self.links.clone(),
            None,
            &EngineConfig::default(),
            pairs,
        )
    }

    fn game_ban(&self) -> Option<Punishment> {
        self.game.punishment_of(PunishmentType::Ban, self.identity.game)
    }
}

fn vip_pair(direction: SyncDirection) -> GroupSyncPairConfig {
    GroupSyncPairConfig {
        group_name: "vip".to_string(),
        server_context: None,
        guild_id: GUILD,
        role_id: ROLE,
        settings: SyncSettings::new(direction, TieBreakers::default()),
    }
}

#[tokio::test]
async fn test_game_ban_pushed_with_reason() {
    let h = Harness::new();
    h.game.seed_punishment(
        PunishmentType::Ban,
        h.identity.game,
        Punishment::permanent().with_reason("cheating"),
    );
    let bans = h.bans(SyncSettings::new(
        SyncDirection::Bidirectional,
        TieBreakers::all(SyncSide::Game),
    ));

    let summary = bans.resync(Someone::Game(h.identity.game)).await;

    assert_eq!(summary.count(SyncResult::AddedRemote), 1);
    let remote_ban = h.remote.ban_of(GUILD, h.identity.remote).unwrap();
    assert_eq!(remote_ban.reason.as_deref(), Some("cheating"));

    // The platform echoes our ban back; it must not be debounced or reconciled.
    assert!(!bans.on_remote_changed(GUILD, h.identity.remote, Some(remote_ban)));
    assert!(!bans.is_pending(GUILD, h.identity.remote));
}

#[tokio::test]
async fn test_temporary_game_ban_is_permanent_remotely() {
    let h = Harness::new();
    let until = Utc::now() + ChronoDuration::days(3);
    h.game.seed_punishment(PunishmentType::Ban, h.identity.game, Punishment::until(until));
    let bans = h.bans(SyncSettings::default());

    let outcome = bans.on_game_punished(h.identity.game, Punishment::until(until)).await.unwrap();

    assert_eq!(outcome.results(), vec![SyncResult::AddedRemote]);
    assert!(h.remote.ban_of(GUILD, h.identity.remote).unwrap().is_permanent());
}

#[tokio::test]
async fn test_game_pardon_lifts_remote_ban() {
    let h = Harness::new();
    h.remote.seed_ban(GUILD, h.identity.remote, Punishment::permanent());
    let bans = h.bans(SyncSettings::default());

    let outcome = bans.on_game_pardoned(h.identity.game).await.unwrap();

    assert_eq!(outcome.results(), vec![SyncResult::RemovedRemote]);
    assert!(h.remote.ban_of(GUILD, h.identity.remote).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_audit_entry_commits_pending_ban_with_attribution() {
    let h = Harness::new();
    h.remote.seed_ban(GUILD, h.identity.remote, Punishment::permanent());
    let bans = h.bans(SyncSettings::default());

    assert!(bans.on_remote_changed(GUILD, h.identity.remote, Some(Punishment::permanent())));
    assert!(bans.is_pending(GUILD, h.identity.remote));

    tokio::time::sleep(Duration::from_secs(1)).await;
    let audit = Punishment::permanent().with_reason("griefing").with_punisher("Moderator");
    let trigger = bans.on_audit_log_entry(GUILD, h.identity.remote, Some(audit)).await;

    assert_eq!(trigger, CommitTrigger::Enriched);
    assert!(!bans.is_pending(GUILD, h.identity.remote));
    let ban = h.game_ban().unwrap();
    assert_eq!(ban.reason.as_deref(), Some("griefing"));
    assert_eq!(ban.punisher.as_deref(), Some("Moderator"));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.game.writes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_minimal_ban_commits_at_deadline() {
    let h = Harness::new();
    h.remote.seed_ban(GUILD, h.identity.remote, Punishment::permanent());
    let bans = h.bans(SyncSettings::default());

    bans.on_remote_changed(GUILD, h.identity.remote, Some(Punishment::permanent()));

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert!(h.game_ban().is_none());

    tokio::time::sleep(Duration::from_millis(1_001)).await;
    assert!(h.game_ban().is_some());
    assert_eq!(h.game.writes(), 1);
}

#[tokio::test]
async fn test_first_join_makes_remote_authoritative() {
    let h = Harness::new();
    h.remote.seed_ban(GUILD, h.identity.remote, Punishment::permanent().with_reason("alt"));
    let bans = h.bans(SyncSettings::new(
        SyncDirection::Bidirectional,
        TieBreakers::all(SyncSide::Game),
    ));

    let summary = bans.on_game_join(h.identity.game, true).await;

    assert_eq!(summary.count(SyncResult::AddedGame), 1);
    assert!(h.game_ban().is_some());
    assert_eq!(bans.engine().configs()[0].settings.tie_breakers.join, SyncSide::Game);
}

#[tokio::test]
async fn test_returning_player_uses_join_tie_breaker() {
    let h = Harness::new();
    h.remote.seed_ban(GUILD, h.identity.remote, Punishment::permanent());
    let bans = h.bans(SyncSettings::new(
        SyncDirection::Bidirectional,
        TieBreakers::all(SyncSide::Game),
    ));

    let summary = bans.on_game_join(h.identity.game, false).await;

    assert_eq!(summary.count(SyncResult::RemovedRemote), 1);
    assert!(h.game_ban().is_none());
}

#[tokio::test]
async fn test_missing_punishment_backend() {
    let h = Harness::new();
    let bans = PunishmentSync::new(
        BanAdapter::new(None, h.remote.clone()),
        h.links.clone(),
        None,
        &EngineConfig::default(),
        &Harness::punishment_config(SyncSettings::default()),
    );

    let summary = bans.resync(Someone::Game(h.identity.game)).await;

    assert_eq!(summary.count(SyncResult::NoIntegration), 1);
}

#[tokio::test]
async fn test_mute_longer_than_timeout_limit() {
    let h = Harness::new();
    let until = Utc::now() + ChronoDuration::days(40);
    h.game.seed_punishment(PunishmentType::Mute, h.identity.game, Punishment::until(until));
    let mutes = h.mutes();

    let summary = mutes.resync(Someone::Game(h.identity.game)).await;

    assert_eq!(summary.count(SyncResult::PunishmentTooLong), 1);
    assert!(h.remote.timeout_of(GUILD, h.identity.remote).is_none());
    assert_eq!(h.remote.writes(), 0);
}

#[tokio::test]
async fn test_permanent_mute_cannot_be_a_timeout() {
    let h = Harness::new();
    h.game.seed_punishment(PunishmentType::Mute, h.identity.game, Punishment::permanent());
    let mutes = h.mutes();

    let summary = mutes.resync(Someone::Game(h.identity.game)).await;

    assert_eq!(summary.count(SyncResult::PunishmentTooLong), 1);
}

#[tokio::test]
async fn test_short_mute_becomes_timeout() {
    let h = Harness::new();
    let until = Utc::now() + ChronoDuration::hours(2);
    h.game.seed_punishment(
        PunishmentType::Mute,
        h.identity.game,
        Punishment::until(until).with_reason("spam"),
    );
    let mutes = h.mutes();

    let summary = mutes.resync(Someone::Game(h.identity.game)).await;

    assert_eq!(summary.count(SyncResult::AddedRemote), 1);
    assert_eq!(h.remote.timeout_of(GUILD, h.identity.remote), Some(until));
}

#[tokio::test]
async fn test_mute_for_non_member() {
    let h = Harness::new();
    let stranger = LinkedIdentity::new(GameId::random(), RemoteUserId(9_001));
    h.links.link(stranger.game, stranger.remote);
    let mutes = h.mutes();

    let summary = mutes.resync(Someone::Game(stranger.game)).await;

    assert_eq!(summary.count(SyncResult::NotAMember), 1);
}

#[tokio::test]
async fn test_group_round_trip_suppresses_echo() {
    let h = Harness::new();
    let groups = h.groups(&[vip_pair(SyncDirection::Bidirectional)]);
    h.remote.seed_role(GUILD, h.identity.remote, ROLE);

    let outcome = groups.on_role_added(GUILD, ROLE, h.identity.remote).await.unwrap();
    assert_eq!(outcome.results(), vec![SyncResult::AddedGame]);
    assert!(h.game.in_group(h.identity.game, "vip", None));

    let echo = groups.on_group_added(h.identity.game, "vip", None).await.unwrap();
    assert!(echo.is_suppressed());
    assert_eq!(h.remote.writes(), 0);
}

#[tokio::test]
async fn test_inherited_group_cannot_be_removed() {
    let h = Harness::new();
    h.game.seed_inherited_group(h.identity.game, "vip", None);
    let groups = h.groups(&[vip_pair(SyncDirection::Bidirectional)]);

    let outcome = groups.on_role_removed(GUILD, ROLE, h.identity.remote).await.unwrap();

    assert_eq!(outcome.results(), vec![SyncResult::RoleChangeCannotChangeGame]);
    assert_eq!(h.game.writes(), 0);
}

#[tokio::test]
async fn test_remote_to_game_pair_ignores_group_change() {
    let h = Harness::new();
    h.game.seed_group(h.identity.game, "vip", None);
    let groups = h.groups(&[vip_pair(SyncDirection::RemoteToGame)]);

    let outcome = groups.on_group_added(h.identity.game, "vip", None).await.unwrap();

    assert_eq!(outcome.results(), vec![SyncResult::WrongDirection]);
    assert!(!h.remote.holds_role(GUILD, h.identity.remote, ROLE));
}

#[tokio::test]
async fn test_group_pair_failures() {
    let h = Harness::new();
    let limited = GuildId(20);
    h.remote.add_guild(limited, &[Capability::BanMembers]);
    h.remote.add_role_definition(limited, ROLE);
    h.remote.add_member(limited, h.identity.remote);
    h.game.seed_group(h.identity.game, "vip", None);

    let mut no_permission = vip_pair(SyncDirection::Bidirectional);
    no_permission.guild_id = limited;
    let mut zero_role = vip_pair(SyncDirection::Bidirectional);
    zero_role.role_id = RoleId(0);
    let mut missing_role = vip_pair(SyncDirection::Bidirectional);
    missing_role.role_id = RoleId(78);

    let groups = h.groups(&[no_permission, zero_role, missing_role]);
    let summary = groups.resync(Someone::Game(h.identity.game)).await;

    assert_eq!(summary.count(SyncResult::PermissionDenied), 1);
    assert_eq!(summary.count(SyncResult::InvalidConfig), 1);
    assert_eq!(summary.count(SyncResult::RoleMissing), 1);
    assert_eq!(summary.failures(), 3);
}

#[tokio::test]
async fn test_groups_without_permission_backend() {
    let h = Harness::new();
    let groups = GroupSync::new(
        GroupAdapter::new(None, h.remote.clone()),
        h.links.clone(),
        None,
        &EngineConfig::default(),
        &[vip_pair(SyncDirection::Bidirectional)],
    );

    let summary = groups.on_game_join(h.identity.game).await;

    assert_eq!(summary.count(SyncResult::NoIntegration), 1);
}

#[tokio::test(start_paused = true)]
async fn test_audit_entry_keeps_pending_timeout_expiry() {
    let h = Harness::new();
    let until = Utc::now() + ChronoDuration::hours(1);
    h.remote.seed_timeout(GUILD, h.identity.remote, until);
    let mutes = h.mutes();

    assert!(mutes.on_remote_changed(GUILD, h.identity.remote, Some(Punishment::until(until))));
    let audit = Punishment::permanent().with_reason("spam").with_punisher("Moderator");
    let trigger = mutes.on_audit_log_entry(GUILD, h.identity.remote, Some(audit)).await;

    assert_eq!(trigger, CommitTrigger::Enriched);
    let mute = h.game.punishment_of(PunishmentType::Mute, h.identity.game).unwrap();
    assert_eq!(mute.until, Some(until));
    assert_eq!(mute.reason.as_deref(), Some("spam"));
    assert_eq!(mute.punisher.as_deref(), Some("Moderator"));
}

#[tokio::test]
async fn test_expired_game_mute_is_not_synced() {
    let h = Harness::new();
    let expired = Utc::now() - ChronoDuration::minutes(1);
    h.game.seed_punishment(PunishmentType::Mute, h.identity.game, Punishment::until(expired));
    let mutes = h.mutes();

    let first = mutes.resync(Someone::Game(h.identity.game)).await;
    let second = mutes.resync(Someone::Game(h.identity.game)).await;

    assert_eq!(first.count(SyncResult::AlreadyInSync), 1);
    assert_eq!(second.count(SyncResult::AlreadyInSync), 1);
    assert_eq!(h.remote.writes(), 0);

    // Nothing was written, so a real timeout is not mistaken for an echo.
    let timeout = Punishment::until(Utc::now() + ChronoDuration::hours(1));
    assert!(mutes.on_remote_changed(GUILD, h.identity.remote, Some(timeout)));
    mutes.shutdown();
}

#[tokio::test]
async fn test_expired_game_mute_lifts_remote_timeout() {
    let h = Harness::new();
    h.remote.seed_timeout(GUILD, h.identity.remote, Utc::now() + ChronoDuration::hours(1));
    let mutes = h.mutes();

    let expired = Punishment::until(Utc::now() - ChronoDuration::minutes(1));
    let outcome = mutes.on_game_punished(h.identity.game, expired).await.unwrap();

    assert_eq!(outcome.results(), vec![SyncResult::RemovedRemote]);
    assert!(h.remote.timeout_of(GUILD, h.identity.remote).is_none());
    assert!(!mutes.on_remote_changed(GUILD, h.identity.remote, None));
}

#[tokio::test(start_paused = true)]
async fn test_remote_change_from_gateway_thread() {
    let h = Harness::new();
    h.remote.seed_ban(GUILD, h.identity.remote, Punishment::permanent());
    let bans = h.bans(SyncSettings::default());

    let dispatcher = Arc::clone(&bans);
    let user = h.identity.remote;
    let debounced = std::thread::spawn(move || {
        dispatcher.on_remote_changed(GUILD, user, Some(Punishment::permanent()))
    })
    .join()
    .unwrap();
    assert!(debounced);

    tokio::time::sleep(Duration::from_secs(6)).await;

    assert!(h.game_ban().is_some());
    assert!(!bans.is_pending(GUILD, h.identity.remote));
}

#[tokio::test(start_paused = true)]
async fn test_stale_audit_entry_does_not_revive_ban() {
    let h = Harness::new();
    let bans = h.bans(SyncSettings::default());

    // Banned and unbanned again before the ban's audit entry arrived.
    assert!(bans.on_remote_changed(GUILD, h.identity.remote, Some(Punishment::permanent())));
    assert!(bans.on_remote_changed(GUILD, h.identity.remote, None));
    let audit = Punishment::permanent().with_reason("griefing");
    let trigger = bans.on_audit_log_entry(GUILD, h.identity.remote, Some(audit)).await;

    assert_eq!(trigger, CommitTrigger::Flushed);
    assert!(!bans.is_pending(GUILD, h.identity.remote));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(h.game_ban().is_none());
    assert_eq!(h.game.writes(), 0);
}

#[tokio::test]
async fn test_timeout_needs_moderate_members() {
    let h = Harness::new();
    let bans_only = GuildId(30);
    h.remote.add_guild(bans_only, &[Capability::BanMembers]);
    h.remote.add_member(bans_only, h.identity.remote);
    h.game.seed_punishment(
        PunishmentType::Mute,
        h.identity.game,
        Punishment::until(Utc::now() + ChronoDuration::hours(1)),
    );
    let mut config = Harness::punishment_config(SyncSettings::default());
    config.guild_id = bans_only;
    let adapter = MuteAdapter::new(h.punishments(), h.remote.clone());
    assert_eq!(adapter.required_capabilities(), &[Capability::ModerateMembers]);
    let mutes =
        PunishmentSync::new(adapter, h.links.clone(), None, &EngineConfig::default(), &config);

    let summary = mutes.resync(Someone::Game(h.identity.game)).await;

    assert_eq!(summary.count(SyncResult::PermissionDenied), 1);
    assert_eq!(h.remote.writes(), 0);
}
