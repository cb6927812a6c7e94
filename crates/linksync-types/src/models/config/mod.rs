//! Sync configuration document.
//!
//! One JSON document configures every sync pair. It is validated and
//! normalized once at load/reload; the engine never re-validates during a
//! reconciliation cycle.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::{Validate, ValidationErrors};

use super::ids::{GuildId, RoleId};
use super::sync::SyncSettings;
use crate::error::ConfigError;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct LinkSyncConfig {
    /// Engine timings
    #[validate(nested)]
    #[serde(default)]
    pub engine: EngineConfig,
    /// Ban sync pair
    #[validate(nested)]
    #[serde(default)]
    pub bans: PunishmentSyncConfig,
    /// Mute ↔ timeout sync pair
    #[validate(nested)]
    #[serde(default)]
    pub mutes: PunishmentSyncConfig,
    /// Group ↔ role sync pairs
    #[validate(nested)]
    #[serde(default)]
    pub groups: Vec<GroupSyncPairConfig>,
}

/// Engine-wide timings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct EngineConfig {
    /// How long a minimal remote notification waits for a richer one (ms)
    #[validate(range(max = 60_000_u64))]
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// How long a self-caused write's echo is expected (seconds)
    #[validate(range(min = 1_u64, max = 600_u64))]
    #[serde(default = "default_expectation_ttl_secs")]
    pub expectation_ttl_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            expectation_ttl_secs: default_expectation_ttl_secs(),
        }
    }
}

/// The single pair of a punishment domain (bans or mutes).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct PunishmentSyncConfig {
    /// Enable this domain
    #[serde(default)]
    pub enabled: bool,
    /// Guild whose bans/timeouts are synchronized
    #[serde(default)]
    pub guild_id: GuildId,
    /// Make the remote side authoritative on a player's first join
    #[serde(default = "default_true")]
    pub remote_wins_on_first_join: bool,
    /// Direction, tie-breakers and timer
    #[validate(nested)]
    #[serde(flatten)]
    pub settings: SyncSettings,
}

impl Default for PunishmentSyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            guild_id: GuildId::default(),
            remote_wins_on_first_join: default_true(),
            settings: SyncSettings::default(),
        }
    }
}

/// One group ↔ role mapping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct GroupSyncPairConfig {
    /// Game permission group name
    #[validate(length(min = 1, max = 128))]
    pub group_name: String,
    /// Optional permission context (e.g. a single server)
    #[serde(default)]
    pub server_context: Option<String>,
    /// Guild that owns the role
    pub guild_id: GuildId,
    /// Remote role id
    pub role_id: RoleId,
    /// Direction, tie-breakers and timer
    #[validate(nested)]
    #[serde(flatten)]
    pub settings: SyncSettings,
}

impl GroupSyncPairConfig {
    pub fn describe(&self) -> String {
        match &self.server_context {
            Some(ctx) => format!("group:{}@{ctx} ↔ role:{}", self.group_name, self.role_id),
            None => format!("group:{} ↔ role:{}", self.group_name, self.role_id),
        }
    }
}

impl LinkSyncConfig {
    /// Validate field ranges plus cross-field rules serde cannot express.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate().map_err(|e| validation_to_config_error(&e))?;

        for (name, punishment) in [("bans", &self.bans), ("mutes", &self.mutes)] {
            if punishment.enabled && punishment.guild_id.is_unset() {
                return Err(ConfigError::invalid(
                    format!("{name}.guild_id"),
                    "must be set when the domain is enabled",
                ));
            }
        }

        let mut seen = HashSet::new();
        for (i, pair) in self.groups.iter().enumerate() {
            if pair.guild_id.is_unset() {
                return Err(ConfigError::invalid(format!("groups[{i}].guild_id"), "must not be zero"));
            }
            if pair.role_id.is_unset() {
                return Err(ConfigError::invalid(format!("groups[{i}].role_id"), "must not be zero"));
            }
            let key = (pair.group_name.as_str(), pair.server_context.as_deref(), pair.role_id);
            if !seen.insert(key) {
                return Err(ConfigError::invalid(
                    format!("groups[{i}]"),
                    format!("duplicate pair {}", pair.describe()),
                ));
            }
        }

        Ok(())
    }
}

fn validation_to_config_error(errors: &ValidationErrors) -> ConfigError {
    let field = errors
        .field_errors()
        .keys()
        .next()
        .map_or_else(|| "config".to_string(), ToString::to_string);
    ConfigError::invalid(field, errors.to_string())
}

const fn default_true() -> bool {
    true
}

const fn default_debounce_ms() -> u64 {
    5_000
}

const fn default_expectation_ttl_secs() -> u64 {
    30
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::{SyncDirection, SyncSide};

    fn group_pair(name: &str, role: u64) -> GroupSyncPairConfig {
        GroupSyncPairConfig {
            group_name: name.to_string(),
            server_context: None,
            guild_id: GuildId(1),
            role_id: RoleId(role),
            settings: SyncSettings::default(),
        }
    }

    #[test]
    fn test_parse_full_document() {
        let json = r#"{
            "engine": { "debounce_ms": 2500 },
            "bans": {
                "enabled": true,
                "guild_id": 42,
                "direction": "bidirectional",
                "tie_breakers": { "command": "game", "join": "remote" }
            },
            "groups": [
                { "group_name": "vip", "guild_id": 42, "role_id": 7, "direction": "remote_to_game" }
            ]
        }"#;

        let config: LinkSyncConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.engine.debounce_ms, 2500);
        assert_eq!(config.engine.expectation_ttl_secs, 30);
        assert!(config.bans.enabled);
        assert!(config.bans.remote_wins_on_first_join);
        assert_eq!(config.bans.settings.tie_breakers.join, SyncSide::Remote);
        assert!(!config.mutes.enabled);
        assert_eq!(config.groups.len(), 1);
        assert_eq!(config.groups[0].settings.direction, SyncDirection::RemoteToGame);
        config.check().unwrap();
    }

    #[test]
    fn test_check_rejects_zero_role() {
        let config = LinkSyncConfig { groups: vec![group_pair("vip", 0)], ..Default::default() };
        let err = config.check().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref field, .. } if field == "groups[0].role_id"));
    }

    #[test]
    fn test_check_rejects_duplicate_pairs() {
        let config = LinkSyncConfig {
            groups: vec![group_pair("vip", 7), group_pair("vip", 7)],
            ..Default::default()
        };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_check_rejects_empty_group_name() {
        let config = LinkSyncConfig { groups: vec![group_pair("", 7)], ..Default::default() };
        assert!(config.check().is_err());
    }

    #[test]
    fn test_check_requires_guild_for_enabled_domain() {
        let mut config = LinkSyncConfig::default();
        config.mutes.enabled = true;
        assert!(config.check().is_err());
    }
}
