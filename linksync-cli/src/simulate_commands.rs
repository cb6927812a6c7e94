use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use std::path::Path;
use std::sync::Arc;

use linksync_core::backend::memory::{MemoryGame, MemoryLinks, MemoryRemote};
use linksync_core::backend::{Backends, Capability, PunishmentBackend, PunishmentType};
use linksync_core::{load_config, LinkSyncService, LinkedIdentity, ResyncSummary, Someone};
use linksync_types::{
    GameId, GuildId, LinkSyncConfig, Punishment, PunishmentSyncConfig, RemoteUserId,
    ResultCategory, SyncDirection, SyncSettings, SyncSide, TieBreakers,
};

const SIMULATED_GUILD: GuildId = GuildId(1);

/// Ban a linked player in game and resync them against in-memory backends.
pub async fn simulate_ban(config: Option<&Path>, reason: &str, json: bool) -> Result<()> {
    let config = match config {
        Some(path) => load_config(path)?,
        None => default_config(),
    };
    if !config.bans.enabled {
        anyhow::bail!("Ban sync is disabled in this config");
    }
    let guild = config.bans.guild_id;
    tracing::info!("Simulating ban sync in guild {}", guild);

    let links = Arc::new(MemoryLinks::new());
    let remote = Arc::new(MemoryRemote::new());
    let game = Arc::new(MemoryGame::new());
    remote.add_guild(guild, &[Capability::BanMembers, Capability::ModerateMembers]);

    let player = LinkedIdentity::new(GameId::random(), RemoteUserId(100_000_000_000_000_001));
    remote.add_member(guild, player.remote);
    links.link(player.game, player.remote);
    game.seed_punishment(
        PunishmentType::Ban,
        player.game,
        Punishment::permanent().with_reason(reason),
    );

    let service = LinkSyncService::from_config(
        &config,
        Backends {
            links,
            remote: remote.clone(),
            punishments: Some(Arc::clone(&game) as Arc<dyn PunishmentBackend>),
            permissions: None,
            presence: None,
        },
    );

    let summary = service.bans().resync(Someone::Game(player.game)).await;
    tracing::debug!("Resync of {} finished with {} failure(s)", player.game, summary.failures());
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        service.shutdown();
        return Ok(());
    }

    println!("{}", format!("Game-side ban of {} ({reason})", player.game).cyan());
    print_summary(&summary);

    match remote.ban_of(guild, player.remote) {
        Some(ban) => {
            println!(
                "{} Remote ban applied, reason: {}",
                "✓".green(),
                ban.reason.as_deref().unwrap_or("-")
            );
            let debounced = service.bans().on_remote_changed(guild, player.remote, Some(ban));
            if debounced {
                println!("{} Echo of our own ban was not recognized", "✗".red());
            } else {
                println!("{} Echo of our own ban suppressed", "✓".green());
            }
        },
        None => println!("{}", "Remote side unchanged".yellow()),
    }

    service.shutdown();
    Ok(())
}

fn default_config() -> LinkSyncConfig {
    LinkSyncConfig {
        bans: PunishmentSyncConfig {
            enabled: true,
            guild_id: SIMULATED_GUILD,
            remote_wins_on_first_join: true,
            settings: SyncSettings::new(
                SyncDirection::Bidirectional,
                TieBreakers::all(SyncSide::Game),
            ),
        },
        ..LinkSyncConfig::default()
    }
}

fn print_summary(summary: &ResyncSummary) {
    if summary.is_empty() {
        println!("{}", "No pairs configured.".yellow());
        return;
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Result", "Pairs"]);
    for (result, subjects) in summary.iter() {
        let color = match result.category() {
            ResultCategory::Success => Color::Green,
            ResultCategory::Skipped => Color::Yellow,
            ResultCategory::Failure => Color::Red,
        };
        table.add_row(vec![Cell::new(result).fg(color), Cell::new(subjects.join(", "))]);
    }
    println!("{table}");
}
