//! Cached, deduplicated, rate-limited reverse geocoding.
//!
//! [`ReverseGeocoder`] owns every piece of state a lookup touches: the
//! persistent cache, the in-flight registry, the dispatch queue and the
//! provider. Construct one per process and share it by reference.
//!
//! # Request Flow
//!
//! ```text
//! (lat, lon) ──► normalize ──► invalid ──► None
//!                   │
//!                   ▼
//!              cache lookup ──► fresh ──► cached result
//!                   │ missing or stale
//!                   ▼
//!              in-flight? ──► yes ──► await shared result
//!                   │ no
//!                   ▼
//!              scheduler ──► pace ──► provider ──► ok / negative
//!                                                   │
//!                                     cache write ◄─┘──► result
//! ```
//!
//! Provider and cache failures never surface as errors. A failed lookup is
//! cached as an all-empty result with the same TTL as a successful one, so a
//! failing provider is not retried until the entry goes stale.

mod stats;

pub use stats::{GeocoderStats, StatsSnapshot};

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{self, BoxFuture, FutureExt};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{now_millis, CacheEntry, CacheStore};
use crate::config::GeocoderConfig;
use crate::coord::{normalize, CacheKey, GeoPoint, LanguageTag, NormalizedQuery};
use crate::inflight::{Admission, InFlightRegistry};
use crate::provider::{
    NominatimProvider, ProviderError, ReqwestClient, ReverseGeocodeResult, ReverseProvider,
};
use crate::scheduler::Scheduler;

/// Errors raised while constructing a geocoder.
#[derive(Debug, Error)]
pub enum GeocoderError {
    /// The HTTP client could not be created.
    #[error("Failed to create provider: {0}")]
    Provider(#[from] ProviderError),

    /// No Tokio runtime is available to host the scheduler.
    #[error("Reverse geocoder must be started inside a Tokio runtime")]
    NoRuntime,
}

/// State shared with scheduled fetches.
struct GeocoderCore<P> {
    store: CacheStore,
    provider: P,
    stats: GeocoderStats,
    ttl: Duration,
}

impl<P: ReverseProvider> GeocoderCore<P> {
    /// Returns the cached value if the entry is younger than the TTL.
    ///
    /// Counts a stale entry once; this is the only place staleness is recorded
    /// for a request.
    async fn fresh_entry(&self, key: &CacheKey) -> Option<ReverseGeocodeResult> {
        let entry = self.store.get(key.as_str()).await?;
        let now = now_millis();
        if entry.is_fresh(now, self.ttl) {
            Some(entry.value)
        } else {
            self.stats.stale();
            debug!(key = %key, age_ms = entry.age_ms(now), "Cached entry is stale");
            None
        }
    }

    /// Same as [`fresh_entry`](Self::fresh_entry) without loading the store
    /// or touching the counters.
    fn fresh_entry_loaded(&self, key: &CacheKey) -> Option<ReverseGeocodeResult> {
        self.store
            .peek(key.as_str())
            .filter(|entry| entry.is_fresh(now_millis(), self.ttl))
            .map(|entry| entry.value)
    }

    /// Performs the provider request and records the outcome in the cache.
    async fn fetch_and_store(&self, query: NormalizedQuery) -> ReverseGeocodeResult {
        let started = Instant::now();

        let result = match self.provider.reverse(&query).await {
            Ok(result) => {
                info!(
                    key = %query.key,
                    place = %result,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Resolved location"
                );
                result
            }
            Err(e) => {
                self.stats.failure();
                warn!(
                    key = %query.key,
                    provider = self.provider.name(),
                    error = %e,
                    "Reverse geocoding failed, caching negative result"
                );
                ReverseGeocodeResult::negative()
            }
        };

        self.store
            .put(query.key.as_str(), CacheEntry::now(result.clone()))
            .await;
        result
    }
}

/// Reverse geocoder with persistent caching, request coalescing and global
/// rate limiting.
///
/// # Example
///
/// ```no_run
/// use revgeo::config::GeocoderConfig;
/// use revgeo::geocoder::ReverseGeocoder;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = GeocoderConfig::new("photos/.geocode-cache.json")
///     .with_user_agent("my-gallery/1.0");
/// let geocoder = ReverseGeocoder::nominatim(config)?;
///
/// if let Some(place) = geocoder.reverse_geocode(40.7128, -74.0060).await {
///     println!("{}", place);
/// }
/// geocoder.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct ReverseGeocoder<P: ReverseProvider = NominatimProvider<ReqwestClient>> {
    core: Arc<GeocoderCore<P>>,
    registry: InFlightRegistry<ReverseGeocodeResult>,
    scheduler: Scheduler,
    language: LanguageTag,
}

impl ReverseGeocoder<NominatimProvider<ReqwestClient>> {
    /// Starts a geocoder backed by Nominatim over HTTP.
    pub fn nominatim(config: GeocoderConfig) -> Result<Self, GeocoderError> {
        let http_client = ReqwestClient::with_timeout(config.request_timeout)?;
        let provider =
            NominatimProvider::with_endpoint(http_client, &config.endpoint, &config.user_agent);
        Self::start(config, provider)
    }
}

impl<P: ReverseProvider> ReverseGeocoder<P> {
    /// Starts a geocoder with the given provider.
    ///
    /// Spawns the scheduler worker; the cache file is read lazily on the
    /// first lookup.
    pub fn start(config: GeocoderConfig, provider: P) -> Result<Self, GeocoderError> {
        let store = CacheStore::new(config.cache_file.clone());
        Self::with_store(config, store, provider)
    }

    /// Starts a geocoder around an existing store.
    pub fn with_store(
        config: GeocoderConfig,
        store: CacheStore,
        provider: P,
    ) -> Result<Self, GeocoderError> {
        tokio::runtime::Handle::try_current().map_err(|_| GeocoderError::NoRuntime)?;

        debug!(
            cache_file = %store.path().display(),
            language = %config.language,
            min_interval_ms = config.min_interval.as_millis() as u64,
            "Starting reverse geocoder"
        );

        Ok(Self {
            core: Arc::new(GeocoderCore {
                store,
                provider,
                stats: GeocoderStats::new(),
                ttl: config.ttl,
            }),
            registry: InFlightRegistry::new(),
            scheduler: Scheduler::start(config.scheduler_config()),
            language: config.language,
        })
    }

    /// Resolves a point using the configured language.
    ///
    /// Returns `None` only when either coordinate is NaN or infinite. Failed
    /// lookups yield a result with every field empty.
    pub async fn reverse_geocode(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Option<ReverseGeocodeResult> {
        self.reverse_geocode_with(GeoPoint::new(latitude, longitude), &self.language)
            .await
    }

    /// Resolves a point in an explicit language.
    pub async fn reverse_geocode_with(
        &self,
        point: GeoPoint,
        language: &LanguageTag,
    ) -> Option<ReverseGeocodeResult> {
        let stats = &self.core.stats;
        stats.request();

        let Some(query) = normalize(point, language) else {
            stats.invalid();
            debug!(
                latitude = point.latitude,
                longitude = point.longitude,
                "Rejected non-finite coordinates"
            );
            return None;
        };

        if let Some(value) = self.core.fresh_entry(&query.key).await {
            stats.cache_hit();
            debug!(key = %query.key, "Cache hit");
            return Some(value);
        }

        let (admission, pending) = self
            .registry
            .get_or_schedule(&query.key, || self.start_lookup(&query));

        if admission == Admission::Joined {
            stats.joined();
            debug!(key = %query.key, "Joined in-flight lookup");
        }

        Some(pending.await)
    }

    /// Runs under the registry's entry lock.
    ///
    /// Re-checks the cache so a fetch that completed between the caller's
    /// cache miss and this point is not repeated.
    fn start_lookup(&self, query: &NormalizedQuery) -> BoxFuture<'static, ReverseGeocodeResult> {
        if let Some(value) = self.core.fresh_entry_loaded(&query.key) {
            self.core.stats.cache_hit();
            return future::ready(value).boxed();
        }

        self.core.stats.fetch();
        debug!(
            key = %query.key,
            queued = self.scheduler.queued(),
            "Scheduling provider request"
        );

        let core = Arc::clone(&self.core);
        let query = query.clone();
        let key = query.key.clone();
        let result = self
            .scheduler
            .enqueue(async move { core.fetch_and_store(query).await });

        async move {
            result.await.unwrap_or_else(|_| {
                warn!(key = %key, "Lookup ended without a result");
                ReverseGeocodeResult::negative()
            })
        }
        .boxed()
    }

    pub fn language(&self) -> &LanguageTag {
        &self.language
    }

    pub fn store(&self) -> &CacheStore {
        &self.core.store
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.core.stats.snapshot()
    }

    /// Number of lookups currently in flight.
    pub fn in_flight(&self) -> usize {
        self.registry.len()
    }

    /// Waits for queued provider requests to finish, then stops the worker.
    pub async fn shutdown(self) {
        self.scheduler.shutdown().await;
        debug!("Reverse geocoder stopped");
    }
}
