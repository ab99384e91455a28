//! Single-flight de-duplication of expensive loads.
//!
//! The first caller for a key starts the work; every concurrent caller for
//! the same key awaits the same shared future instead of starting another.

use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

type SharedAttempt<T> = Shared<BoxFuture<'static, T>>;

#[derive(Clone)]
struct Attempt<T: Clone> {
    /// Distinguishes this attempt from any successor under the same key, so
    /// finishers only remove their own entry.
    ticket: u64,
    future: SharedAttempt<T>,
}

/// Keyed single-flight groups.
pub struct FlightGroup<K: Eq + Hash, T: Clone> {
    attempts: DashMap<K, Attempt<T>>,
    tickets: AtomicU64,
}

impl<K, T> Default for FlightGroup<K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> FlightGroup<K, T>
where
    K: Eq + Hash,
    T: Clone,
{
    pub fn new() -> Self {
        Self {
            attempts: DashMap::new(),
            tickets: AtomicU64::new(0),
        }
    }

    /// Whether an attempt for `key` is currently registered.
    pub fn in_flight(&self, key: &K) -> bool {
        self.attempts.contains_key(key)
    }
}

impl<K, T> FlightGroup<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone,
{
    /// Await the result for `key`, calling `begin` only when no attempt is
    /// already in flight.
    pub async fn run<F, Fut>(&self, key: K, begin: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        use dashmap::mapref::entry::Entry;

        // The entry guard must drop before the await below; the map shard
        // stays locked while it lives.
        let (ticket, future) = match self.attempts.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                let attempt = occupied.get();
                (attempt.ticket, attempt.future.clone())
            }
            Entry::Vacant(vacant) => {
                let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
                let future = begin().boxed().shared();
                vacant.insert(Attempt {
                    ticket,
                    future: future.clone(),
                });
                (ticket, future)
            }
        };

        let value = future.await;
        self.attempts
            .remove_if(&key, |_, attempt| attempt.ticket == ticket);
        value
    }
}
