//! Resync scheduler: cause-triggered resyncs of every pair and periodic timers.

use futures::future::join_all;
use linksync_types::{ResultCategory, ResyncCause, SyncCause, SyncResult, SyncSide};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

use super::adapter::{Pair, SyncAdapter};
use super::engine::{outcome_result, SyncEngine};
use super::policy;
use crate::error::SyncFailure;
use crate::identity::Someone;

/// Subjects (pair descriptions or players) grouped by result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResyncSummary {
    results: BTreeMap<SyncResult, Vec<String>>,
}

impl ResyncSummary {
    pub fn record(&mut self, result: SyncResult, subject: impl Into<String>) {
        self.results.entry(result).or_default().push(subject.into());
    }

    pub fn count(&self, result: SyncResult) -> usize {
        self.results.get(&result).map_or(0, Vec::len)
    }

    pub fn total(&self) -> usize {
        self.results.values().map(Vec::len).sum()
    }

    /// Number of writes issued.
    pub fn changes(&self) -> usize {
        self.results.iter().filter(|(r, _)| r.is_change()).map(|(_, s)| s.len()).sum()
    }

    pub fn failures(&self) -> usize {
        self.results
            .iter()
            .filter(|(r, _)| r.category() == ResultCategory::Failure)
            .map(|(_, s)| s.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn subjects(&self, result: SyncResult) -> &[String] {
        self.results.get(&result).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SyncResult, &[String])> {
        self.results.iter().map(|(r, s)| (*r, s.as_slice()))
    }

    pub fn merge(&mut self, other: Self) {
        for (result, subjects) in other.results {
            self.results.entry(result).or_default().extend(subjects);
        }
    }

    /// One-line operator summary.
    pub fn describe(&self) -> String {
        if self.results.is_empty() {
            return "nothing to synchronize".to_string();
        }
        self.results
            .iter()
            .map(|(result, subjects)| format!("{result}: {}", subjects.join(", ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl fmt::Display for ResyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

impl<A: SyncAdapter> SyncEngine<A> {
    /// Reconcile every configured pair for one identity.
    ///
    /// `over` receives each pair's configured tie-breaker for `cause` and
    /// returns the one to use; stored config is never touched.
    pub async fn resync_all<F>(&self, cause: ResyncCause, someone: Someone, over: F) -> ResyncSummary
    where
        F: Fn(ResyncCause, SyncSide) -> SyncSide + Send + Sync,
    {
        let pairs = self.configs();
        let mut summary = ResyncSummary::default();
        if pairs.is_empty() {
            return summary;
        }

        let identity = match someone.resolve(self.links.as_ref()).await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                tracing::debug!("[Resync] {} {:?} for {}: not linked", self.terms().domain, cause, someone);
                for pair in &pairs {
                    summary.record(SyncResult::NotLinked, pair.describe());
                }
                return summary;
            },
            Err(err) => {
                let failure = SyncFailure::from(err);
                tracing::warn!("[Resync] {} {:?} for {} failed: {}", self.terms().domain, cause, someone, failure);
                for pair in &pairs {
                    summary.record(failure.reason(), pair.describe());
                }
                return summary;
            },
        };

        let attempts = pairs.iter().map(|pair| {
            let tie_breakers = policy::effective_tie_breakers(&pair.settings, cause, &over);
            self.attempt(pair, identity, SyncCause::from(cause), tie_breakers)
        });
        let outcomes = join_all(attempts).await;

        for (pair, outcome) in pairs.iter().zip(outcomes) {
            summary.record(outcome_result(&outcome), pair.describe());
        }
        summary
    }

    /// Replace the pairs and restart their timers.
    pub fn reload(self: &Arc<Self>, pairs: Vec<Pair<A>>) {
        self.replace_pairs(pairs);
        self.start_timers();
    }

    /// (Re)start one periodic task per pair with an enabled timer.
    pub fn start_timers(self: &Arc<Self>) {
        let mut timers = self.timers.lock();
        for handle in timers.drain(..) {
            handle.abort();
        }

        for pair in self.configs().into_iter().filter(|p| p.settings.timer.enabled) {
            let minutes = u64::from(pair.settings.timer.cycle_minutes.max(1));
            let period = Duration::from_secs(minutes * 60);
            let engine = Arc::downgrade(self);
            tracing::info!(
                "[Resync] {} {}: timer every {} minute(s)",
                self.terms().domain,
                pair.describe(),
                minutes
            );

            let first_tick = Instant::now() + period;
            timers.push(tokio::spawn(async move {
                let mut interval = tokio::time::interval_at(first_tick, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    interval.tick().await;
                    let Some(engine) = engine.upgrade() else {
                        break;
                    };
                    engine.run_timer_cycle(&pair).await;
                }
            }));
        }
    }

    pub fn active_timers(&self) -> usize {
        self.timers.lock().iter().filter(|h| !h.is_finished()).count()
    }

    /// Stop every timer. Pairs stay configured.
    pub fn shutdown(&self) {
        let mut timers = self.timers.lock();
        let stopped = timers.len();
        for handle in timers.drain(..) {
            handle.abort();
        }
        if stopped > 0 {
            tracing::info!("[Resync] {}: stopped {} timer(s)", self.terms().domain, stopped);
        }
    }

    /// Reconcile every online player for one pair.
    pub async fn run_timer_cycle(&self, pair: &Pair<A>) -> ResyncSummary {
        let mut summary = ResyncSummary::default();
        let Some(presence) = &self.presence else {
            return summary;
        };

        let players = presence.online_players().await;
        let outcomes = join_all(
            players.iter().map(|player| self.reconcile(pair, Someone::Game(*player), SyncCause::Timer)),
        )
        .await;
        for (player, outcome) in players.iter().zip(outcomes) {
            summary.record(outcome_result(&outcome), player.to_string());
        }

        if summary.changes() > 0 || summary.failures() > 0 {
            tracing::info!("[Resync] {} {} timer: {}", self.terms().domain, pair.describe(), summary);
        } else {
            tracing::debug!(
                "[Resync] {} {} timer: {} player(s) checked",
                self.terms().domain,
                pair.describe(),
                summary.total()
            );
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_groups_by_result() {
        let mut summary = ResyncSummary::default();
        summary.record(SyncResult::AddedRemote, "bans");
        summary.record(SyncResult::AlreadyInSync, "group:vip ↔ role:7");
        summary.record(SyncResult::AlreadyInSync, "group:staff ↔ role:8");
        summary.record(SyncResult::BackendError, "mutes");

        assert_eq!(summary.total(), 4);
        assert_eq!(summary.changes(), 1);
        assert_eq!(summary.failures(), 1);
        assert_eq!(summary.count(SyncResult::AlreadyInSync), 2);
        assert_eq!(
            summary.describe(),
            "added on remote side: bans; already in sync: group:vip ↔ role:7, group:staff ↔ role:8; \
             backend error: mutes"
        );
    }

    #[test]
    fn test_merge() {
        let mut a = ResyncSummary::default();
        a.record(SyncResult::NotLinked, "bans");
        let mut b = ResyncSummary::default();
        b.record(SyncResult::NotLinked, "mutes");

        a.merge(b);
        assert_eq!(a.subjects(SyncResult::NotLinked), ["bans".to_string(), "mutes".to_string()]);
    }

    #[test]
    fn test_summary_serializes_as_map() {
        let mut summary = ResyncSummary::default();
        summary.record(SyncResult::PunishmentTooLong, "mutes:10");

        let json = serde_json::to_value(&summary).unwrap_or_default();
        assert_eq!(json, serde_json::json!({ "punishment_too_long": ["mutes:10"] }));
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(ResyncSummary::default().to_string(), "nothing to synchronize");
    }
}
