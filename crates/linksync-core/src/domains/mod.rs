//! Concrete sync domains.
//!
//! - **bans**: game bans ↔ guild bans, one pair
//! - **mutes**: game mutes ↔ member timeouts, one pair
//! - **groups**: permission groups ↔ roles, one pair per mapping

pub mod bans;
pub mod groups;
pub mod mutes;
pub mod punishment;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;

pub use bans::BanAdapter;
pub use groups::{GroupAdapter, GroupKey, GroupSync, RoleKey};
pub use mutes::MuteAdapter;
pub use punishment::{PunishmentAdapter, PunishmentSync, RemotePunishmentEvent};
