//! Reverse-geocoding provider abstraction
//!
//! This module provides the HTTP client seam and the Nominatim provider used
//! to resolve coordinates into places.
//!
//! ```ignore
//! use revgeo::provider::{NominatimProvider, ReqwestClient};
//!
//! let http_client = ReqwestClient::new()?;
//! let provider = NominatimProvider::new(http_client, "my-app/1.0");
//! let place = provider.reverse(&query).await?;
//! ```

mod http;
mod nominatim;
mod types;

pub use http::{AsyncHttpClient, HttpRequest, ReqwestClient, DEFAULT_TIMEOUT};
pub use nominatim::{
    parse_response, NominatimProvider, CITY_FIELDS, COUNTRY_FIELDS, DEFAULT_ENDPOINT,
    PROVINCE_FIELDS,
};
pub use types::{BoxFuture, ProviderError, ReverseGeocodeResult, ReverseProvider};

#[cfg(test)]
pub use http::tests::MockHttpClient;
