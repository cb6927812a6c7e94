//! Punishment descriptor shared by ban and mute sync.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// An active punishment on either side.
///
/// Absence of a punishment is modelled as `Option<Punishment>::None` by the
/// adapters, so this type always describes something in force.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Punishment {
    /// Expiry; `None` means permanent
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    /// Free-form reason as given by the punisher
    #[serde(default)]
    pub reason: Option<String>,
    /// Display name of whoever issued it
    #[serde(default)]
    pub punisher: Option<String>,
}

impl Punishment {
    /// Permanent punishment with no attribution.
    pub fn permanent() -> Self {
        Self::default()
    }

    /// Punishment expiring at `until`.
    pub fn until(until: DateTime<Utc>) -> Self {
        Self { until: Some(until), ..Self::default() }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_punisher(mut self, punisher: impl Into<String>) -> Self {
        self.punisher = Some(punisher.into());
        self
    }

    pub fn is_permanent(&self) -> bool {
        self.until.is_none()
    }

    /// A temporary punishment that has run out is no longer in force.
    pub fn is_elapsed(&self, now: DateTime<Utc>) -> bool {
        self.until.is_some_and(|until| until <= now)
    }

    /// Remaining duration from `now`; `None` for permanent punishments.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.until.map(|until| until - now)
    }

    /// Fill attribution fields that are missing here from `other`.
    pub fn merge_attribution(mut self, other: &Self) -> Self {
        if self.reason.is_none() {
            self.reason.clone_from(&other.reason);
        }
        if self.punisher.is_none() {
            self.punisher.clone_from(&other.punisher);
        }
        if self.until.is_none() {
            self.until = other.until;
        }
        self
    }
}
