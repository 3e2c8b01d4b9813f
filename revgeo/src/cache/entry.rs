//! Persisted cache entry.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider::ReverseGeocodeResult;

/// A cached lookup result with its write time.
///
/// Serialized as `{"v": <result>, "t": <epoch millis>}`. The timestamp is the
/// moment the entry was written, for positive and negative results alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(rename = "v")]
    pub value: ReverseGeocodeResult,

    #[serde(rename = "t")]
    pub timestamp_ms: i64,
}

impl CacheEntry {
    /// Creates an entry stamped with the current wall-clock time.
    pub fn now(value: ReverseGeocodeResult) -> Self {
        Self::at(value, now_millis())
    }

    pub fn at(value: ReverseGeocodeResult, timestamp_ms: i64) -> Self {
        Self {
            value,
            timestamp_ms,
        }
    }

    /// Milliseconds since the entry was written, as seen at `now_ms`.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.timestamp_ms)
    }

    /// Returns true while the entry is younger than `ttl`.
    pub fn is_fresh(&self, now_ms: i64, ttl: Duration) -> bool {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        self.age_ms(now_ms) < ttl_ms
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
