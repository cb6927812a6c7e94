//! Event debouncer.
//!
//! Some remote backends emit a minimal "state changed" notification before,
//! or instead of, a richer audit entry that carries attribution. The first
//! minimal observation opens a token with a deadline; a richer observation
//! for the same entity commits the token early with its payload, otherwise the
//! minimal payload commits when the deadline fires.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// What caused a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitTrigger {
    /// A richer observation claimed a pending token
    Enriched,
    /// The deadline fired with the minimal payload
    Deadline,
    /// A richer observation arrived with nothing pending
    Direct,
    /// A conflicting observation committed the pending payload as is
    Flushed,
}

impl fmt::Display for CommitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Enriched => write!(f, "enriched"),
            Self::Deadline => write!(f, "deadline"),
            Self::Direct => write!(f, "direct"),
            Self::Flushed => write!(f, "flushed"),
        }
    }
}

pub type CommitFn<V> = Arc<dyn Fn(V, CommitTrigger) -> BoxFuture<'static, ()> + Send + Sync>;

type PendingMap<K, V> = DashMap<K, Arc<DebounceToken<K, V>>>;

/// A pending change for one entity. Commits at most once.
pub struct DebounceToken<K, V> {
    key: K,
    target: Mutex<V>,
    claimed: AtomicBool,
    deadline: Mutex<Option<JoinHandle<()>>>,
    pending: Weak<PendingMap<K, V>>,
    commit: CommitFn<V>,
}

impl<K, V> DebounceToken<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    /// Commit with `enriched` if given, else the pending target.
    ///
    /// Returns `false` if another caller already claimed this token.
    pub async fn commit(self: &Arc<Self>, enriched: Option<V>, trigger: CommitTrigger) -> bool {
        let value = {
            let target = self.target.lock();
            if self
                .claimed
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
            {
                return false;
            }
            enriched.unwrap_or_else(|| target.clone())
        };

        // The deadline task commits from inside itself and must not abort itself.
        if trigger != CommitTrigger::Deadline {
            if let Some(handle) = self.deadline.lock().take() {
                handle.abort();
            }
        }

        if let Some(pending) = self.pending.upgrade() {
            pending.remove_if(&self.key, |_, token| Arc::ptr_eq(token, self));
        }

        (self.commit)(value, trigger).await;
        true
    }

    /// Overwrite the target unless already claimed.
    fn retarget(&self, value: V) -> Result<(), V> {
        let mut target = self.target.lock();
        if self.is_claimed() {
            return Err(value);
        }
        *target = value;
        Ok(())
    }

    fn cancel(&self) -> bool {
        if self.claimed.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return false;
        }
        if let Some(handle) = self.deadline.lock().take() {
            handle.abort();
        }
        true
    }
}

/// At most one pending token per key.
pub struct EventDebouncer<K: Eq + Hash, V> {
    name: &'static str,
    pending: Arc<PendingMap<K, V>>,
    delay: Duration,
    commit: CommitFn<V>,
    runtime: Handle,
}

impl<K, V> EventDebouncer<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Deadline tasks run on the runtime current at construction, so
    /// [`upsert`](Self::upsert) may be called from threads outside it.
    ///
    /// # Panics
    ///
    /// Outside a Tokio runtime.
    pub fn new(name: &'static str, delay: Duration, commit: CommitFn<V>) -> Self {
        Self { name, pending: Arc::new(DashMap::new()), delay, commit, runtime: Handle::current() }
    }

    /// Open a token for `key`, or retarget the one already pending.
    pub fn upsert(&self, key: K, initial: V) -> Arc<DebounceToken<K, V>> {
        match self.pending.entry(key.clone()) {
            Entry::Occupied(mut occupied) => match occupied.get().retarget(initial) {
                Ok(()) => {
                    tracing::debug!("[Debounce] {} {:?}: pending change overwritten", self.name, key);
                    Arc::clone(occupied.get())
                },
                Err(initial) => {
                    let token = self.spawn_token(key, initial);
                    occupied.insert(Arc::clone(&token));
                    token
                },
            },
            Entry::Vacant(vacant) => {
                let token = self.spawn_token(key, initial);
                vacant.insert(Arc::clone(&token));
                token
            },
        }
    }

    /// Commit the pending token for `key` with a richer payload.
    ///
    /// With nothing pending (or the deadline already claimed it) the payload
    /// is committed directly.
    pub async fn enrich(&self, key: &K, value: V) -> CommitTrigger {
        let token = self.pending.get(key).map(|entry| Arc::clone(entry.value()));
        if let Some(token) = token {
            if token.commit(Some(value.clone()), CommitTrigger::Enriched).await {
                return CommitTrigger::Enriched;
            }
        }
        (self.commit)(value, CommitTrigger::Direct).await;
        CommitTrigger::Direct
    }

    /// Commit the pending token for `key` with its own payload.
    ///
    /// Returns `false` if nothing was pending or it was already claimed.
    pub async fn flush(&self, key: &K) -> bool {
        let token = self.pending.get(key).map(|entry| Arc::clone(entry.value()));
        match token {
            Some(token) => token.commit(None, CommitTrigger::Flushed).await,
            None => false,
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Current target of the pending token for `key`, if any.
    pub fn pending_value(&self, key: &K) -> Option<V> {
        self.pending.get(key).map(|token| token.target.lock().clone())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop every pending token without committing.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        self.pending.retain(|_, token| {
            if token.cancel() {
                cancelled += 1;
            }
            false
        });
        cancelled
    }

    fn spawn_token(&self, key: K, initial: V) -> Arc<DebounceToken<K, V>> {
        let token = Arc::new(DebounceToken {
            key,
            target: Mutex::new(initial),
            claimed: AtomicBool::new(false),
            deadline: Mutex::new(None),
            pending: Arc::downgrade(&self.pending),
            commit: Arc::clone(&self.commit),
        });

        // The delay starts on the runtime's clock, not the caller's thread.
        let delay = self.delay;
        let timer_token = Arc::clone(&token);
        let handle = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            timer_token.commit(None, CommitTrigger::Deadline).await;
        });
        *token.deadline.lock() = Some(handle);
        token
    }
}

impl<K: Eq + Hash, V> Drop for EventDebouncer<K, V> {
    fn drop(&mut self) {
        for entry in self.pending.iter() {
            if let Some(handle) = entry.value().deadline.lock().take() {
                handle.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    type Commits = Arc<Mutex<Vec<(&'static str, CommitTrigger)>>>;

    fn recording_debouncer(delay_secs: u64) -> (EventDebouncer<u64, &'static str>, Commits) {
        let commits: Commits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&commits);
        let commit: CommitFn<&'static str> =
            Arc::new(move |value: &'static str, trigger: CommitTrigger| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().push((value, trigger));
                }
                .boxed()
            });
        (EventDebouncer::new("test", Duration::from_secs(delay_secs), commit), commits)
    }

    async fn sleep_secs(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_enriched_commit_cancels_deadline() {
        let (debouncer, commits) = recording_debouncer(5);

        debouncer.upsert(1, "minimal");
        sleep_secs(2).await;
        assert_eq!(debouncer.enrich(&1, "enriched").await, CommitTrigger::Enriched);

        sleep_secs(10).await;

        assert_eq!(*commits.lock(), vec![("enriched", CommitTrigger::Enriched)]);
        assert!(!debouncer.is_pending(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_minimal_commits_at_deadline() {
        let (debouncer, commits) = recording_debouncer(5);

        debouncer.upsert(1, "minimal");
        sleep_secs(4).await;
        assert!(commits.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(1_001)).await;

        assert_eq!(*commits.lock(), vec![("minimal", CommitTrigger::Deadline)]);
        assert!(!debouncer.is_pending(&1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_observation_overwrites_pending_token() {
        let (debouncer, commits) = recording_debouncer(5);

        let first = debouncer.upsert(1, "first");
        let second = debouncer.upsert(1, "second");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(debouncer.pending_count(), 1);
        assert_eq!(debouncer.pending_value(&1), Some("second"));

        sleep_secs(6).await;

        assert_eq!(*commits.lock(), vec![("second", CommitTrigger::Deadline)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_claimed_once() {
        let (debouncer, commits) = recording_debouncer(5);

        let token = debouncer.upsert(1, "minimal");
        assert!(token.commit(None, CommitTrigger::Enriched).await);
        assert!(!token.commit(Some("late"), CommitTrigger::Enriched).await);

        sleep_secs(6).await;
        assert_eq!(commits.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_upsert_from_thread_outside_runtime() {
        let (debouncer, commits) = recording_debouncer(5);
        let debouncer = Arc::new(debouncer);

        let dispatcher = Arc::clone(&debouncer);
        std::thread::spawn(move || {
            dispatcher.upsert(3, "gateway");
        })
        .join()
        .unwrap();
        assert!(debouncer.is_pending(&3));

        sleep_secs(6).await;

        assert_eq!(*commits.lock(), vec![("gateway", CommitTrigger::Deadline)]);
        assert!(!debouncer.is_pending(&3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrich_without_pending_commits_directly() {
        let (debouncer, commits) = recording_debouncer(5);

        assert_eq!(debouncer.enrich(&7, "audit").await, CommitTrigger::Direct);
        assert_eq!(*commits.lock(), vec![("audit", CommitTrigger::Direct)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_commits_pending_payload() {
        let (debouncer, commits) = recording_debouncer(5);

        debouncer.upsert(1, "minimal");
        assert!(debouncer.flush(&1).await);
        assert!(!debouncer.flush(&1).await);

        sleep_secs(6).await;
        assert_eq!(*commits.lock(), vec![("minimal", CommitTrigger::Flushed)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all_drops_pending() {
        let (debouncer, commits) = recording_debouncer(5);
        debouncer.upsert(1, "a");
        debouncer.upsert(2, "b");

        assert_eq!(debouncer.cancel_all(), 2);
        sleep_secs(6).await;

        assert!(commits.lock().is_empty());
        assert_eq!(debouncer.pending_count(), 0);
    }
}
