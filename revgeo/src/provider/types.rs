//! Core types shared by reverse-geocoding providers.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::NormalizedQuery;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;

/// A resolved place.
///
/// All fields are `None` for the negative result stored when a lookup
/// fails. Serialized with camelCase names to keep existing cache files
/// readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseGeocodeResult {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ReverseGeocodeResult {
    /// The all-empty result cached for failed lookups.
    pub fn negative() -> Self {
        Self::default()
    }

    /// Returns true if no field was resolved.
    pub fn is_negative(&self) -> bool {
        self.city.is_none()
            && self.province.is_none()
            && self.country.is_none()
            && self.display_name.is_none()
    }
}

impl fmt::Display for ReverseGeocodeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [&self.city, &self.province, &self.country]
            .into_iter()
            .filter_map(|part| part.as_deref())
            .collect();

        if parts.is_empty() {
            write!(f, "(unknown place)")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Errors from a single provider request.
///
/// These never reach callers of the geocoder; they are logged and turned into
/// a negative result.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// The request could not be sent or the body could not be read.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The provider answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body was not the expected JSON.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The provider endpoint could not be turned into a URL.
    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

/// A reverse-geocoding backend.
///
/// Implementations perform exactly one attempt per call; pacing, caching and
/// deduplication are handled by [`crate::geocoder::ReverseGeocoder`].
pub trait ReverseProvider: Send + Sync + 'static {
    /// Resolves a normalized query to a place.
    fn reverse<'a>(
        &'a self,
        query: &'a NormalizedQuery,
    ) -> BoxFuture<'a, Result<ReverseGeocodeResult, ProviderError>>;

    /// Human-readable provider name for logs.
    fn name(&self) -> &str;
}
