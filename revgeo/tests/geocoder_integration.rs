//! Integration tests for the reverse geocoder.
//!
//! These tests drive the full lookup path with a scripted HTTP client:
//! - Nominatim request construction and address fallback
//! - Cache file persistence, TTL expiry and negative caching
//! - Coalescing of concurrent lookups
//! - Global pacing of provider requests under Tokio's paused clock
//!
//! Run with: `cargo test --test geocoder_integration`

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tempfile::TempDir;
use tokio::time::Instant;

use revgeo::cache::{now_millis, CacheEntry, CacheStore};
use revgeo::provider::{AsyncHttpClient, BoxFuture, HttpRequest, NominatimProvider, ProviderError};
use revgeo::{GeoPoint, GeocoderConfig, LanguageTag, ReverseGeocodeResult, ReverseGeocoder};

// ============================================================================
// Helper Functions
// ============================================================================

const INTERVAL: Duration = Duration::from_millis(1000);
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

type Responder = dyn Fn(&HttpRequest) -> Result<Vec<u8>, ProviderError> + Send + Sync;

/// HTTP client that answers from a closure and records when it was called.
#[derive(Clone)]
struct ScriptedClient {
    respond: Arc<Responder>,
    delay: Duration,
    log: Arc<Mutex<Vec<(Instant, HttpRequest)>>>,
}

impl ScriptedClient {
    fn new<F>(respond: F) -> Self
    where
        F: Fn(&HttpRequest) -> Result<Vec<u8>, ProviderError> + Send + Sync + 'static,
    {
        Self {
            respond: Arc::new(respond),
            delay: Duration::ZERO,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn json(body: &'static str) -> Self {
        Self::new(move |_| Ok(body.as_bytes().to_vec()))
    }

    fn failing(status: u16) -> Self {
        Self::new(move |request| {
            Err(ProviderError::Status {
                status,
                url: request.url.clone(),
            })
        })
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn calls(&self) -> usize {
        self.log.lock().len()
    }

    fn call_times(&self) -> Vec<Instant> {
        self.log.lock().iter().map(|(at, _)| *at).collect()
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().iter().map(|(_, r)| r.clone()).collect()
    }
}

impl AsyncHttpClient for ScriptedClient {
    fn get<'a>(&'a self, request: &'a HttpRequest) -> BoxFuture<'a, Result<Vec<u8>, ProviderError>> {
        Box::pin(async move {
            self.log.lock().push((Instant::now(), request.clone()));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            (self.respond)(request)
        })
    }
}

/// Echoes the requested latitude back as the city name.
fn echo_client() -> ScriptedClient {
    ScriptedClient::new(|request| {
        let lat = request
            .url
            .split(['?', '&'])
            .find_map(|pair| pair.strip_prefix("lat="))
            .unwrap_or("?");
        Ok(format!(r#"{{"address": {{"city": "lat {}"}}}}"#, lat).into_bytes())
    })
}

const NEW_YORK: &str = r#"{
    "display_name": "New York, United States",
    "address": {"city": "New York", "state": "New York", "country": "United States"}
}"#;

fn geocoder(
    cache_file: &Path,
    client: &ScriptedClient,
) -> ReverseGeocoder<NominatimProvider<ScriptedClient>> {
    let config = GeocoderConfig::new(cache_file).with_user_agent("revgeo-tests/1.0");
    let provider = NominatimProvider::new(client.clone(), config.user_agent.clone());
    ReverseGeocoder::start(config, provider).unwrap()
}

fn read_cache_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A fresh cache resolves New York through one provider request and
/// persists it under the rounded key.
#[tokio::test(start_paused = true)]
async fn test_new_york_lookup_is_cached() {
    let temp = TempDir::new().unwrap();
    let cache_file = temp.path().join("geocode-cache.json");
    let client = ScriptedClient::json(NEW_YORK);
    let geocoder = geocoder(&cache_file, &client);

    let place = geocoder.reverse_geocode(40.7128, -74.0060).await.unwrap();
    assert_eq!(place.city.as_deref(), Some("New York"));
    assert_eq!(place.province.as_deref(), Some("New York"));
    assert_eq!(place.country.as_deref(), Some("United States"));
    assert_eq!(place.display_name.as_deref(), Some("New York, United States"));

    let request = &client.requests()[0];
    assert!(request.url.contains("/reverse?lat=40.713&lon=-74.006&format=json&accept-language=en"));
    assert_eq!(request.header("User-Agent"), Some("revgeo-tests/1.0"));

    let raw = read_cache_json(&cache_file);
    let entry = &raw["40.713,-74.006@en"];
    assert_eq!(entry["v"]["city"], "New York");
    assert!((now_millis() - entry["t"].as_i64().unwrap()).abs() < 60_000);

    // Same rounded cell, no new request.
    let again = geocoder.reverse_geocode(40.71284, -74.00599).await.unwrap();
    assert_eq!(again, place);
    assert_eq!(client.calls(), 1);
}

/// A new process sharing the cache file never hits the network for known
/// places.
#[tokio::test(start_paused = true)]
async fn test_cache_survives_restart() {
    let temp = TempDir::new().unwrap();
    let cache_file = temp.path().join("geocode-cache.json");

    let first_client = ScriptedClient::json(NEW_YORK);
    let first = geocoder(&cache_file, &first_client);
    first.reverse_geocode(40.7128, -74.0060).await;
    first.shutdown().await;

    let second_client = ScriptedClient::json("{}");
    let second = geocoder(&cache_file, &second_client);
    let place = second.reverse_geocode(40.7128, -74.0060).await.unwrap();

    assert_eq!(place.city.as_deref(), Some("New York"));
    assert_eq!(second_client.calls(), 0);
}

/// Non-finite input returns `None` without reading or writing the cache.
#[tokio::test(start_paused = true)]
async fn test_non_finite_input_has_no_side_effects() {
    let temp = TempDir::new().unwrap();
    let cache_file = temp.path().join("geocode-cache.json");
    let client = echo_client();
    let geocoder = geocoder(&cache_file, &client);

    assert_eq!(geocoder.reverse_geocode(f64::NAN, 0.0).await, None);
    assert_eq!(geocoder.reverse_geocode(0.0, f64::NEG_INFINITY).await, None);

    assert_eq!(client.calls(), 0);
    assert!(!geocoder.store().is_loaded());
    assert!(!cache_file.exists());
}

/// Ten concurrent callers for one place share a single provider request.
#[tokio::test(start_paused = true)]
async fn test_concurrent_lookups_coalesce() {
    let temp = TempDir::new().unwrap();
    let client = ScriptedClient::json(NEW_YORK).with_delay(Duration::from_millis(400));
    let geocoder = geocoder(&temp.path().join("cache.json"), &client);

    let lookups = (0..10).map(|_| geocoder.reverse_geocode(40.7128, -74.0060));
    let results = futures::future::join_all(lookups).await;

    assert_eq!(client.calls(), 1);
    let first = results[0].clone().unwrap();
    assert!(results.iter().all(|r| r.as_ref() == Some(&first)));
}

/// Distinct places are dispatched one per interval, in arrival order.
#[tokio::test(start_paused = true)]
async fn test_provider_requests_are_paced() {
    let temp = TempDir::new().unwrap();
    let client = echo_client();
    let geocoder = geocoder(&temp.path().join("cache.json"), &client);

    let start = Instant::now();
    let lookups = (0..5).map(|i| geocoder.reverse_geocode(10.0 + i as f64, 20.0));
    let results = futures::future::join_all(lookups).await;

    let times = client.call_times();
    assert_eq!(times.len(), 5);
    assert!(times[0] - start < INTERVAL);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= INTERVAL);
    }
    assert!(Instant::now() - start >= INTERVAL * 4);

    for (i, result) in results.iter().enumerate() {
        let expected = format!("lat {}", 10 + i);
        assert_eq!(result.as_ref().unwrap().city.as_deref(), Some(expected.as_str()));
    }
}

/// Pacing holds across sequential callers too, not just a single burst.
#[tokio::test(start_paused = true)]
async fn test_sequential_lookups_are_paced() {
    let temp = TempDir::new().unwrap();
    let client = echo_client();
    let geocoder = geocoder(&temp.path().join("cache.json"), &client);

    geocoder.reverse_geocode(1.0, 1.0).await;
    geocoder.reverse_geocode(2.0, 2.0).await;
    geocoder.reverse_geocode(3.0, 3.0).await;

    let times = client.call_times();
    assert_eq!(times.len(), 3);
    assert!(times[1] - times[0] >= INTERVAL);
    assert!(times[2] - times[1] >= INTERVAL);
}

/// Failed requests are cached as all-empty results and not retried.
#[tokio::test(start_paused = true)]
async fn test_failure_is_cached_negative() {
    let temp = TempDir::new().unwrap();
    let cache_file = temp.path().join("cache.json");
    let client = ScriptedClient::failing(500);
    let geocoder = geocoder(&cache_file, &client);

    let first = geocoder.reverse_geocode(-33.8688, 151.2093).await.unwrap();
    assert_eq!(first, ReverseGeocodeResult::negative());

    let raw = read_cache_json(&cache_file);
    let value = &raw["-33.869,151.209@en"]["v"];
    assert!(value["city"].is_null());
    assert!(value["province"].is_null());
    assert!(value["country"].is_null());

    let second = geocoder.reverse_geocode(-33.8688, 151.2093).await.unwrap();
    assert!(second.is_negative());
    assert_eq!(client.calls(), 1);
    assert_eq!(geocoder.stats().failures, 1);
}

/// Garbage bodies are treated like any other failure.
#[tokio::test(start_paused = true)]
async fn test_malformed_body_is_cached_negative() {
    let temp = TempDir::new().unwrap();
    let client = ScriptedClient::json("<html>Bandwidth exceeded</html>");
    let geocoder = geocoder(&temp.path().join("cache.json"), &client);

    assert!(geocoder.reverse_geocode(5.0, 5.0).await.unwrap().is_negative());
    assert!(geocoder.reverse_geocode(5.0, 5.0).await.unwrap().is_negative());
    assert_eq!(client.calls(), 1);
}

/// An entry older than the TTL is refetched and overwritten.
#[tokio::test(start_paused = true)]
async fn test_stale_entry_is_replaced() {
    let temp = TempDir::new().unwrap();
    let cache_file = temp.path().join("cache.json");

    let seeded = CacheStore::new(&cache_file);
    seeded
        .put(
            "40.713,-74.006@en",
            CacheEntry::at(
                ReverseGeocodeResult {
                    city: Some("New Amsterdam".to_string()),
                    ..Default::default()
                },
                now_millis() - 366 * DAY_MS,
            ),
        )
        .await;
    drop(seeded);

    let client = ScriptedClient::json(NEW_YORK);
    let geocoder = geocoder(&cache_file, &client);

    let place = geocoder.reverse_geocode(40.7128, -74.0060).await.unwrap();
    assert_eq!(place.city.as_deref(), Some("New York"));
    assert_eq!(client.calls(), 1);

    let raw = read_cache_json(&cache_file);
    assert_eq!(raw["40.713,-74.006@en"]["v"]["city"], "New York");
    let written = raw["40.713,-74.006@en"]["t"].as_i64().unwrap();
    assert!(now_millis() - written < DAY_MS);
}

/// An entry just inside the TTL is served without a request.
#[tokio::test(start_paused = true)]
async fn test_entry_within_ttl_is_served() {
    let temp = TempDir::new().unwrap();
    let cache_file = temp.path().join("cache.json");
    std::fs::write(
        &cache_file,
        format!(
            r#"{{"1,2@en": {{"v": {{"city": "Cached"}}, "t": {}}}}}"#,
            now_millis() - 364 * DAY_MS
        ),
    )
    .unwrap();

    let client = echo_client();
    let geocoder = geocoder(&cache_file, &client);

    let place = geocoder.reverse_geocode(1.0, 2.0).await.unwrap();
    assert_eq!(place.city.as_deref(), Some("Cached"));
    assert_eq!(client.calls(), 0);
}

/// A corrupt cache file behaves like an empty one and is replaced.
#[tokio::test(start_paused = true)]
async fn test_corrupt_cache_file_is_replaced() {
    let temp = TempDir::new().unwrap();
    let cache_file = temp.path().join("cache.json");
    std::fs::write(&cache_file, "{\"truncated\": ").unwrap();

    let client = ScriptedClient::json(NEW_YORK);
    let geocoder = geocoder(&cache_file, &client);
    geocoder.reverse_geocode(40.7128, -74.0060).await;

    let raw = read_cache_json(&cache_file);
    assert!(raw.get("40.713,-74.006@en").is_some());
    assert!(raw.get("truncated").is_none());
}

/// Address fields fall back through the priority lists.
#[tokio::test(start_paused = true)]
async fn test_address_fallback() {
    let temp = TempDir::new().unwrap();
    let client = ScriptedClient::json(
        r#"{"address": {"city": "", "town": "Hallstatt", "region": "Upper Austria", "country": "Austria"}}"#,
    );
    let geocoder = geocoder(&temp.path().join("cache.json"), &client);

    let place = geocoder.reverse_geocode(47.5622, 13.6493).await.unwrap();
    assert_eq!(place.city.as_deref(), Some("Hallstatt"));
    assert_eq!(place.province.as_deref(), Some("Upper Austria"));
    assert_eq!(place.country.as_deref(), Some("Austria"));
    assert_eq!(place.display_name, None);
}

/// The language tag is part of the request and of the cache key.
#[tokio::test(start_paused = true)]
async fn test_language_is_part_of_key() {
    let temp = TempDir::new().unwrap();
    let cache_file = temp.path().join("cache.json");
    let client = echo_client();
    let geocoder = geocoder(&cache_file, &client);

    let point = GeoPoint::new(35.6762, 139.6503);
    geocoder.reverse_geocode_with(point, &LanguageTag::new("ja")).await;
    geocoder.reverse_geocode_with(point, &LanguageTag::new("en")).await;

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].header("Accept-Language"), Some("ja"));
    assert!(requests[0].url.ends_with("accept-language=ja"));

    let raw = read_cache_json(&cache_file);
    assert!(raw.get("35.676,139.65@ja").is_some());
    assert!(raw.get("35.676,139.65@en").is_some());
}

/// Negative zero and positive zero share one cache entry.
#[tokio::test(start_paused = true)]
async fn test_signed_zero_shares_entry() {
    let temp = TempDir::new().unwrap();
    let cache_file = temp.path().join("cache.json");
    let client = echo_client();
    let geocoder = geocoder(&cache_file, &client);

    geocoder.reverse_geocode(-0.0001, 0.0).await;
    geocoder.reverse_geocode(0.0, -0.0).await;

    assert_eq!(client.calls(), 1);
    assert!(read_cache_json(&cache_file).get("0,0@en").is_some());
}
