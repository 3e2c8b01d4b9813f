//! In-flight request coalescing.
//!
//! At most one lookup per cache key is pending at any instant. The first
//! caller for a key starts the work; later callers receive a clone of the
//! same shared future and observe the same result without a second network
//! call. Once the work settles, the key is removed so a later cache miss can
//! schedule a fresh lookup.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::trace;

use crate::coord::CacheKey;

/// A shareable handle to a pending lookup.
pub type Pending<T> = Shared<BoxFuture<'static, T>>;

/// How a caller was admitted by [`InFlightRegistry::get_or_schedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Another caller's lookup was already pending; this caller joined it.
    Joined,
    /// This caller started the lookup.
    Scheduled,
}

/// Registry of pending lookups keyed by cache key.
pub struct InFlightRegistry<T: Clone + Send + Sync + 'static> {
    pending: Arc<DashMap<CacheKey, Pending<T>>>,
}

impl<T: Clone + Send + Sync + 'static> InFlightRegistry<T> {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Returns the pending lookup for `key`, starting one if none exists.
    ///
    /// The check and the insert happen under the map entry's lock, so two
    /// callers can never both start work for the same key. `start` runs while
    /// that lock is held: it must not call back into this registry.
    ///
    /// A watcher task is spawned for every started lookup; it drives the
    /// shared future to completion and removes the key exactly once, whether
    /// or not any caller is still awaiting it.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn get_or_schedule<F>(&self, key: &CacheKey, start: F) -> (Admission, Pending<T>)
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let pending = match self.pending.entry(key.clone()) {
            Entry::Occupied(existing) => return (Admission::Joined, existing.get().clone()),
            Entry::Vacant(slot) => {
                let pending = start().shared();
                slot.insert(pending.clone());
                pending
            }
        };

        let registry = Arc::clone(&self.pending);
        let watched = pending.clone();
        let key = key.clone();
        tokio::spawn(async move {
            watched.await;
            registry.remove(&key);
            trace!(key = %key, "Lookup settled, removed from in-flight registry");
        });

        (Admission::Scheduled, pending)
    }

    /// Returns true if a lookup for `key` is pending.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.pending.contains_key(key)
    }

    /// Number of pending lookups.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for InFlightRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
