//! Loading the sync configuration document.
//!
//! The document is validated and normalized here once. Engines receive the
//! result on construction or reload and never re-check it.

use linksync_types::{ConfigError, LinkSyncConfig, SyncSettings};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use crate::sync::policy::normalize_settings;

/// Read, parse, validate and normalize the document at `path`.
pub fn load_config(path: &Path) -> Result<LinkSyncConfig, ConfigError> {
    load_config_with_warnings(path).map(|(config, _)| config)
}

/// Like [`load_config`], also returning the normalization warnings.
pub fn load_config_with_warnings(path: &Path) -> Result<(LinkSyncConfig, Vec<String>), ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ConfigError::NotFound { path: path.display().to_string() },
        _ => ConfigError::from_io_error(&e),
    })?;

    let (config, warnings) = parse_with_warnings(&content)?;
    tracing::info!(
        "[Config] Loaded {} (bans: {}, mutes: {}, groups: {})",
        path.display(),
        config.bans.enabled,
        config.mutes.enabled,
        config.groups.len()
    );
    Ok((config, warnings))
}

/// Parse, validate and normalize a JSON document.
pub fn parse_config(content: &str) -> Result<LinkSyncConfig, ConfigError> {
    parse_with_warnings(content).map(|(config, _)| config)
}

fn parse_with_warnings(content: &str) -> Result<(LinkSyncConfig, Vec<String>), ConfigError> {
    let mut config: LinkSyncConfig =
        serde_json::from_str(content).map_err(|e| ConfigError::from_json_error(&e))?;
    config.check()?;
    let warnings = normalize(&mut config);
    Ok((config, warnings))
}

/// Correct tie-breakers that contradict their pair's direction.
///
/// Returns one warning per corrected entry; each is also logged.
pub fn normalize(config: &mut LinkSyncConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    for (name, punishment) in [("bans", &mut config.bans), ("mutes", &mut config.mutes)] {
        if punishment.enabled {
            collect(&mut warnings, name, &mut punishment.settings);
        }
    }
    for pair in &mut config.groups {
        let label = pair.describe();
        collect(&mut warnings, &label, &mut pair.settings);
    }

    warnings
}

fn collect(warnings: &mut Vec<String>, pair: &str, settings: &mut SyncSettings) {
    for correction in normalize_settings(settings, pair) {
        warnings.push(format!(
            "{pair}: {:?} tie-breaker {} contradicts direction {}, using {}",
            correction.cause, correction.configured, settings.direction, correction.corrected
        ));
    }
}
