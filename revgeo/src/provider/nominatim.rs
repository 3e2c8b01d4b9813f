//! Nominatim (OpenStreetMap) reverse-geocoding provider.
//!
//! # API Endpoint
//!
//! `GET {endpoint}/reverse?lat={lat}&lon={lon}&format=json&accept-language={tag}`
//!
//! The public instance allows at most one request per second and requires an
//! identifying `User-Agent`. Pacing is the scheduler's job; this provider only
//! builds requests and parses responses.
//!
//! # Address Fallback
//!
//! Nominatim names the same administrative level differently depending on
//! the country, so each output field takes the first non-empty address key
//! from a priority list (see [`CITY_FIELDS`], [`PROVINCE_FIELDS`]).

use std::collections::HashMap;

use reqwest::Url;
use serde::Deserialize;

use crate::coord::NormalizedQuery;
use crate::provider::{
    AsyncHttpClient, BoxFuture, HttpRequest, ProviderError, ReverseGeocodeResult, ReverseProvider,
};

/// Public Nominatim instance.
pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org";

/// Address keys tried, in order, for the city.
pub const CITY_FIELDS: &[&str] = &[
    "city",
    "town",
    "village",
    "municipality",
    "city_district",
    "suburb",
    "county",
    "hamlet",
];

/// Address keys tried, in order, for the province.
pub const PROVINCE_FIELDS: &[&str] = &["province", "state", "region", "state_district"];

/// Address keys tried, in order, for the country.
pub const COUNTRY_FIELDS: &[&str] = &["country"];

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: Option<HashMap<String, String>>,
}

/// Nominatim reverse-geocoding provider.
///
/// # Example
///
/// ```no_run
/// use revgeo::provider::{NominatimProvider, ReqwestClient};
///
/// let client = ReqwestClient::new().unwrap();
/// let provider = NominatimProvider::new(client, "my-photo-site/1.0");
/// ```
pub struct NominatimProvider<C: AsyncHttpClient> {
    http_client: C,
    endpoint: String,
    user_agent: String,
}

impl<C: AsyncHttpClient> NominatimProvider<C> {
    /// Creates a provider against the public Nominatim instance.
    pub fn new(http_client: C, user_agent: impl Into<String>) -> Self {
        Self::with_endpoint(http_client, DEFAULT_ENDPOINT, user_agent)
    }

    /// Creates a provider against a self-hosted or alternative endpoint.
    pub fn with_endpoint(
        http_client: C,
        endpoint: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            endpoint,
            user_agent: user_agent.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Builds the request for a query, using its rounded coordinates.
    fn build_request(&self, query: &NormalizedQuery) -> Result<HttpRequest, ProviderError> {
        let base = format!("{}/reverse", self.endpoint);
        let url = Url::parse_with_params(
            &base,
            &[
                ("lat", query.latitude.to_string()),
                ("lon", query.longitude.to_string()),
                ("format", "json".to_string()),
                ("accept-language", query.language.to_string()),
            ],
        )
        .map_err(|e| ProviderError::InvalidUrl(format!("{}: {}", base, e)))?;

        Ok(HttpRequest::get(url.to_string())
            .with_header("Accept", "application/json")
            .with_header("User-Agent", self.user_agent.clone())
            .with_header("Accept-Language", query.language.to_string()))
    }

    async fn fetch(&self, query: &NormalizedQuery) -> Result<ReverseGeocodeResult, ProviderError> {
        let request = self.build_request(query)?;
        let body = self.http_client.get(&request).await?;
        parse_response(&body)
    }
}

impl<C: AsyncHttpClient> ReverseProvider for NominatimProvider<C> {
    fn reverse<'a>(
        &'a self,
        query: &'a NormalizedQuery,
    ) -> BoxFuture<'a, Result<ReverseGeocodeResult, ProviderError>> {
        Box::pin(self.fetch(query))
    }

    fn name(&self) -> &str {
        "Nominatim"
    }
}

/// Parses a Nominatim JSON body into a result.
pub fn parse_response(body: &[u8]) -> Result<ReverseGeocodeResult, ProviderError> {
    let response: NominatimResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    let address = response.address.unwrap_or_default();

    Ok(ReverseGeocodeResult {
        city: first_present(&address, CITY_FIELDS),
        province: first_present(&address, PROVINCE_FIELDS),
        country: first_present(&address, COUNTRY_FIELDS),
        display_name: response.display_name.filter(|s| !s.is_empty()),
    })
}

/// Returns the first non-empty value among `keys`.
fn first_present(address: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| address.get(*key))
        .find(|value| !value.is_empty())
        .cloned()
}
