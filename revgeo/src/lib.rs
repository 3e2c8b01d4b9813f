//! Revgeo - cached reverse geocoding for photo metadata
//!
//! Turns GPS coordinates into city, province and country names through the
//! public Nominatim service while staying inside its usage policy. Results
//! are kept in a JSON cache file for a year, concurrent lookups for the same
//! place share one request, and every outbound request goes through a single
//! queue that dispatches at most once per second.
//!
//! # Example
//!
//! ```no_run
//! use revgeo::{GeocoderConfig, ReverseGeocoder};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let geocoder = ReverseGeocoder::nominatim(GeocoderConfig::new("geocode-cache.json"))?;
//! let place = geocoder.reverse_geocode(48.8584, 2.2945).await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod coord;
pub mod geocoder;
pub mod inflight;
pub mod logging;
pub mod provider;
pub mod scheduler;

pub use config::{ConfigFile, GeocoderConfig};
pub use coord::{CacheKey, GeoPoint, LanguageTag};
pub use geocoder::{GeocoderError, ReverseGeocoder, StatsSnapshot};
pub use provider::ReverseGeocodeResult;

/// Crate version, sent in the default `User-Agent`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
