//! Lookup counters for observability.
//!
//! Counters are lock-free atomics updated on the hot path; callers read them
//! through a point-in-time [`StatsSnapshot`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters maintained by the geocoder.
#[derive(Debug, Default)]
pub struct GeocoderStats {
    requests: AtomicU64,
    invalid: AtomicU64,
    cache_hits: AtomicU64,
    stale: AtomicU64,
    joined: AtomicU64,
    fetches: AtomicU64,
    failures: AtomicU64,
}

impl GeocoderStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn invalid(&self) {
        self.invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stale(&self) {
        self.stale.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn joined(&self) {
        self.joined.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            joined: self.joined.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`GeocoderStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Calls to the public lookup operation.
    pub requests: u64,
    /// Calls rejected for non-finite coordinates.
    pub invalid: u64,
    /// Calls answered from a fresh cache entry.
    pub cache_hits: u64,
    /// Cache entries found but older than the TTL.
    pub stale: u64,
    /// Calls that joined a lookup already in flight.
    pub joined: u64,
    /// Provider requests scheduled.
    pub fetches: u64,
    /// Provider requests that failed and were cached as negative.
    pub failures: u64,
}

impl StatsSnapshot {
    /// Fraction of valid requests served without a new provider request.
    pub fn hit_rate(&self) -> f64 {
        let valid = self.requests.saturating_sub(self.invalid);
        if valid == 0 {
            return 0.0;
        }
        (self.cache_hits + self.joined) as f64 / valid as f64
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests: {} cached, {} joined, {} fetched ({} failed), {} invalid, {:.0}% hit rate",
            self.requests,
            self.cache_hits,
            self.joined,
            self.fetches,
            self.failures,
            self.invalid,
            self.hit_rate() * 100.0
        )
    }
}
