//! Expectation cache for feedback-loop suppression.
//!
//! Before the engine writes a value it records what the write's echo
//! notification will report. The first matching notification within the TTL
//! consumes the record and is dropped.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

const DEFAULT_SOFT_LIMIT: usize = 1_000;

#[derive(Debug, Clone)]
struct Expectation<V> {
    value: V,
    recorded_at: Instant,
}

impl<V> Expectation<V> {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.recorded_at.elapsed() >= ttl
    }
}

/// Per-entity expected next values with a TTL.
pub struct ExpectationCache<K, V> {
    entries: DashMap<K, Expectation<V>>,
    ttl: Duration,
    soft_limit: usize,
}

impl<K, V> ExpectationCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self { entries: DashMap::new(), ttl, soft_limit: DEFAULT_SOFT_LIMIT }
    }

    pub fn with_soft_limit(mut self, soft_limit: usize) -> Self {
        self.soft_limit = soft_limit;
        self
    }

    /// Expect `value` to be reported for `key`, replacing any earlier record.
    pub fn record(&self, key: K, value: V) {
        self.entries.insert(key, Expectation { value, recorded_at: Instant::now() });

        if self.entries.len() > self.soft_limit {
            let removed = self.purge_expired();
            if removed > 0 {
                tracing::debug!(
                    "[Expectation] Cache cleanup: removed {} stale entries, {} remain",
                    removed,
                    self.entries.len()
                );
            }
        }
    }

    /// Consume the record for `key` if it is live and `matches` the observed value.
    ///
    /// A live record that does not match is kept: the echo may still be in flight.
    pub fn consume_if_expected<F>(&self, key: &K, observed: &V, matches: F) -> bool
    where
        F: Fn(&V, &V) -> bool,
    {
        let ttl = self.ttl;
        if self
            .entries
            .remove_if(key, |_, e| !e.is_expired(ttl) && matches(&e.value, observed))
            .is_some()
        {
            return true;
        }
        self.entries.remove_if(key, |_, e| e.is_expired(ttl));
        false
    }

    /// Withdraw a record whose write never happened.
    pub fn forget(&self, key: &K) {
        self.entries.remove(key);
    }

    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, e| !e.is_expired(ttl));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn ttl(&self) -> Duration {
        self.ttl
    }
}
