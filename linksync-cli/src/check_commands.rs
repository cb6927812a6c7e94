use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, Color, Table};
use std::path::Path;

use linksync_core::config::load_config_with_warnings;
use linksync_types::SyncSettings;

pub fn check_config(path: &Path, json: bool) -> Result<()> {
    let (config, warnings) = load_config_with_warnings(path)?;
    tracing::debug!("{} normalization warning(s) for {}", warnings.len(), path.display());

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Pair", "Direction", "Join", "Link", "Command", "Timer"]);

    let punishments = [("bans", &config.bans), ("mutes", &config.mutes)];
    for (name, pair) in punishments {
        if pair.enabled {
            table.add_row(settings_row(format!("{name}:{}", pair.guild_id), &pair.settings));
        } else {
            table.add_row(vec![Cell::new(name), Cell::new("disabled").fg(Color::DarkGrey)]);
        }
    }
    for pair in &config.groups {
        table.add_row(settings_row(pair.describe(), &pair.settings));
    }

    println!("{table}");
    println!(
        "\nEngine: debounce {} ms, echo expectations kept {} s",
        config.engine.debounce_ms, config.engine.expectation_ttl_secs
    );

    if warnings.is_empty() {
        println!("{}", "✓ Config is valid".green());
    } else {
        println!("{}", format!("✓ Config is valid, {} correction(s):", warnings.len()).yellow());
        for warning in &warnings {
            println!("  - {warning}");
        }
    }
    Ok(())
}

fn settings_row(label: String, settings: &SyncSettings) -> Vec<Cell> {
    let tb = &settings.tie_breakers;
    let timer = if settings.timer.enabled {
        Cell::new(format!("every {} min", settings.timer.cycle_minutes)).fg(Color::Green)
    } else {
        Cell::new("off")
    };
    vec![
        Cell::new(label),
        Cell::new(settings.direction),
        Cell::new(tb.join),
        Cell::new(tb.link),
        Cell::new(tb.command),
        timer,
    ]
}
