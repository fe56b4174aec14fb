//! Coalescing of concurrent identical work.
//!
//! The first caller for a key starts the work; callers arriving while it
//! runs await the same shared future instead of starting their own. The
//! map holds only weak handles, so when every caller has gone away the
//! work is dropped and the next caller starts afresh.

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, WeakShared};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

type Flights<K, T> = HashMap<K, WeakShared<BoxFuture<'static, T>>>;

/// Whether a caller started the work or joined it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightRole {
    /// This caller started the work
    Leader,
    /// This caller awaited work another caller started
    Follower,
}

/// Map from key to in-progress work.
pub struct SingleFlight<K, T> {
    flights: Arc<Mutex<Flights<K, T>>>,
}

impl<K, T> SingleFlight<K, T>
where
    K: Hash + Eq + Clone + Send + std::fmt::Debug + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty map.
    pub fn new() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `work` for `key`, or join the run already in progress.
    ///
    /// `work` is only called when this caller becomes the leader.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> (T, FlightRole)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T> + Send + 'static,
    {
        let (shared, role) = {
            let mut flights = lock(&self.flights);
            match flights.get(&key).and_then(WeakShared::upgrade) {
                Some(shared) => {
                    debug!(?key, "Joining in-flight work");
                    (shared, FlightRole::Follower)
                }
                None => {
                    let shared = self.start(key.clone(), work());
                    if let Some(weak) = shared.downgrade() {
                        flights.insert(key, weak);
                    }
                    (shared, FlightRole::Leader)
                }
            }
        };

        (shared.await, role)
    }

    /// Number of keys with work in progress.
    pub fn in_flight(&self) -> usize {
        lock(&self.flights)
            .values()
            .filter(|weak| weak.upgrade().is_some())
            .count()
    }

    fn start<Fut>(&self, key: K, work: Fut) -> Shared<BoxFuture<'static, T>>
    where
        Fut: Future<Output = T> + Send + 'static,
    {
        let flights = Arc::clone(&self.flights);
        async move {
            let output = work.await;
            lock(&flights).remove(&key);
            output
        }
        .boxed()
        .shared()
    }
}

impl<K, T> Default for SingleFlight<K, T>
where
    K: Hash + Eq + Clone + Send + std::fmt::Debug + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> std::fmt::Debug for SingleFlight<K, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("keys", &lock(&self.flights).len())
            .finish()
    }
}

fn lock<K, T>(flights: &Mutex<Flights<K, T>>) -> MutexGuard<'_, Flights<K, T>> {
    flights.lock().unwrap_or_else(PoisonError::into_inner)
}
