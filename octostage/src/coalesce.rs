//! In-flight operation registry.
//!
//! Concurrent requests for the same key share one execution: the first
//! registrant becomes the owner and performs the work, later registrants
//! wait for the owner's result.
//!
//! # Architecture
//!
//! ```text
//! ensure(A) ─┐
//!            │                       owner
//! ensure(A) ─┼──► InFlight<K, V> ──────────► load A ──┐
//!            │        │                               │
//! ensure(A) ─┘        ▼                               │
//!              [waiters receive ◄──── complete() ─────┘
//!               the same V]
//! ```
//!
//! The entry is removed before the result is broadcast, so a request
//! arriving after completion starts fresh. An owner dropped without
//! completing (cancelled future, panic) removes its entry as well and the
//! waiters observe [`Abandoned`].
//!
//! # Implementation
//!
//! Uses `DashMap`'s entry API so checking for an in-flight entry and
//! registering a new one happen atomically. Statistics use atomic counters.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Statistics for monitoring coalescing effectiveness.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CoalescerStats {
    /// Total registrations
    pub total_requests: u64,
    /// Registrations that waited for existing work
    pub coalesced_requests: u64,
    /// Registrations that started new work
    pub new_requests: u64,
}

impl CoalescerStats {
    /// Returns the coalescing ratio (0.0 to 1.0)
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.coalesced_requests as f64 / self.total_requests as f64
        }
    }
}

/// The owner of an in-flight operation went away without a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abandoned;

type Entries<K, V> = Arc<DashMap<K, broadcast::Sender<V>>>;

/// Registry of in-flight operations keyed by `K` producing `V`.
pub struct InFlight<K, V> {
    entries: Entries<K, V>,
    total_requests: AtomicU64,
    coalesced_requests: AtomicU64,
    new_requests: AtomicU64,
}

impl<K, V> InFlight<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            total_requests: AtomicU64::new(0),
            coalesced_requests: AtomicU64::new(0),
            new_requests: AtomicU64::new(0),
        }
    }

    /// Registers interest in `key`.
    ///
    /// Returns [`Registration::Owner`] for the first registrant, who must
    /// perform the work and call [`OwnerGuard::complete`]. Everybody else
    /// gets a [`Registration::Waiter`].
    pub fn register(&self, key: K) -> Registration<K, V> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        match self.entries.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let receiver = entry.get().subscribe();
                self.coalesced_requests.fetch_add(1, Ordering::Relaxed);
                trace!(key = ?key, "Coalescing with in-flight operation");
                Registration::Waiter(Waiter { receiver })
            }
            Entry::Vacant(entry) => {
                // Typical fan-in is a handful of waiters
                let (sender, _receiver) = broadcast::channel(16);
                entry.insert(sender.clone());
                self.new_requests.fetch_add(1, Ordering::Relaxed);
                trace!(key = ?key, "Starting new in-flight operation");
                Registration::Owner(OwnerGuard {
                    key,
                    sender,
                    entries: Arc::clone(&self.entries),
                    completed: false,
                })
            }
        }
    }

    pub fn is_in_flight(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of currently in-flight operations.
    pub fn in_flight_count(&self) -> usize {
        self.entries.len()
    }

    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> CoalescerStats {
        CoalescerStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            coalesced_requests: self.coalesced_requests.load(Ordering::Relaxed),
            new_requests: self.new_requests.load(Ordering::Relaxed),
        }
    }
}

impl<K, V> Default for InFlight<K, V>
where
    K: Eq + Hash + Clone + Debug,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Result of [`InFlight::register`].
pub enum Registration<K: Eq + Hash, V> {
    /// Perform the work and complete the guard
    Owner(OwnerGuard<K, V>),
    /// Wait for the owner's result
    Waiter(Waiter<V>),
}

impl<K: Eq + Hash, V> Registration<K, V> {
    pub fn is_owner(&self) -> bool {
        matches!(self, Self::Owner(_))
    }
}

/// Ownership of an in-flight operation.
///
/// Dropping the guard without calling [`complete`](Self::complete) removes
/// the entry and wakes the waiters with [`Abandoned`].
pub struct OwnerGuard<K: Eq + Hash, V> {
    key: K,
    sender: broadcast::Sender<V>,
    entries: Entries<K, V>,
    completed: bool,
}

impl<K: Eq + Hash, V> OwnerGuard<K, V> {
    pub fn key(&self) -> &K {
        &self.key
    }

    fn remove_entry(&self) {
        let sender = &self.sender;
        self.entries
            .remove_if(&self.key, |_, current| current.same_channel(sender));
    }

    /// Publishes the result to every waiter. Returns the number of waiters.
    pub fn complete(mut self, value: V) -> usize {
        self.remove_entry();
        self.completed = true;

        let waiters = self.sender.receiver_count();
        // No receivers is fine: nobody coalesced
        let _ = self.sender.send(value);
        if waiters > 0 {
            debug!(waiters, "Broadcast result to coalesced waiters");
        }
        waiters
    }
}

impl<K: Eq + Hash, V> Drop for OwnerGuard<K, V> {
    fn drop(&mut self) {
        if !self.completed {
            self.remove_entry();
            trace!("In-flight operation abandoned by its owner");
        }
    }
}

/// Handle for awaiting another task's in-flight operation.
pub struct Waiter<V> {
    receiver: broadcast::Receiver<V>,
}

impl<V: Clone> Waiter<V> {
    /// Waits for the owner's result.
    pub async fn wait(mut self) -> Result<V, Abandoned> {
        self.receiver.recv().await.map_err(|_| Abandoned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    type Registry = InFlight<String, Result<u32, String>>;

    fn key(name: &str) -> String {
        name.to_string()
    }

    #[tokio::test]
    async fn test_first_registration_is_owner() {
        let registry = Registry::new();

        let first = registry.register(key("a"));
        assert!(first.is_owner());

        let second = registry.register(key("a"));
        assert!(!second.is_owner());

        let other = registry.register(key("b"));
        assert!(other.is_owner());
    }

    #[tokio::test]
    async fn test_waiters_receive_result() {
        let registry = Arc::new(Registry::new());

        let Registration::Owner(owner) = registry.register(key("a")) else {
            panic!("expected owner");
        };

        let handles: Vec<_> = (0..3)
            .map(|_| match registry.register(key("a")) {
                Registration::Waiter(waiter) => tokio::spawn(waiter.wait()),
                Registration::Owner(_) => panic!("expected waiter"),
            })
            .collect();

        assert_eq!(owner.complete(Ok(7)), 3);

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(Ok(7)));
        }
    }

    #[tokio::test]
    async fn test_completion_removes_entry() {
        let registry = Registry::new();

        let Registration::Owner(owner) = registry.register(key("a")) else {
            panic!("expected owner");
        };
        assert_eq!(registry.in_flight_count(), 1);

        owner.complete(Err("boom".to_string()));
        assert_eq!(registry.in_flight_count(), 0);
        assert!(!registry.is_in_flight(&key("a")));

        assert!(registry.register(key("a")).is_owner());
    }

    #[tokio::test]
    async fn test_dropped_owner_abandons_waiters() {
        let registry = Registry::new();

        let owner = registry.register(key("a"));
        let Registration::Waiter(waiter) = registry.register(key("a")) else {
            panic!("expected waiter");
        };

        drop(owner);
        assert_eq!(registry.in_flight_count(), 0);
        assert_eq!(waiter.wait().await, Err(Abandoned));
    }

    #[tokio::test]
    async fn test_owner_dropped_inside_cancelled_future() {
        let registry = Arc::new(Registry::new());

        let r = Arc::clone(&registry);
        let task = tokio::spawn(async move {
            let _owner = r.register(key("a"));
            sleep(Duration::from_secs(60)).await;
        });

        sleep(Duration::from_millis(10)).await;
        let Registration::Waiter(waiter) = registry.register(key("a")) else {
            panic!("expected waiter");
        };

        task.abort();
        assert_eq!(waiter.wait().await, Err(Abandoned));
        assert!(registry.register(key("a")).is_owner());
    }

    #[tokio::test]
    async fn test_stats_tracking() {
        let registry = Registry::new();

        let _owner = registry.register(key("a"));
        let _c1 = registry.register(key("a"));
        let _c2 = registry.register(key("a"));
        let _c3 = registry.register(key("a"));

        let stats = registry.stats();
        assert_eq!(stats.total_requests, 4);
        assert_eq!(stats.new_requests, 1);
        assert_eq!(stats.coalesced_requests, 3);
        assert!((stats.coalescing_ratio() - 0.75).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_concurrent_registration() {
        let registry = Arc::new(Registry::new());

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let r = Arc::clone(&registry);
                tokio::spawn(async move { r.register(key("a")) })
            })
            .collect();

        let registrations: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        let owners = registrations.iter().filter(|r| r.is_owner()).count();
        assert_eq!(owners, 1, "Exactly one registration should own the work");
        assert_eq!(registry.stats().coalesced_requests, 9);
    }
}
