//! Persistent lookup cache.
//!
//! Results are stored in a single JSON file mapping cache keys to
//! `{"v": result, "t": epoch_millis}` records. The file is loaded once per
//! [`CacheStore`] and fully rewritten on every insert. Nothing is ever
//! evicted; entries older than the configured TTL are refreshed by the
//! geocoder and overwritten in place.

mod entry;
mod store;

pub use entry::{now_millis, CacheEntry};
pub use store::{CacheMap, CacheStore, StoreSummary};
