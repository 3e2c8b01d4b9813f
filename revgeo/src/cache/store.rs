//! JSON-file backed lookup cache.
//!
//! The whole map is read lazily on first access and rewritten after every
//! insert. Durability is best-effort: read failures start an empty cache and
//! write failures are logged, leaving the in-memory map authoritative for the
//! rest of the process.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::entry::CacheEntry;

/// Map type as persisted on disk.
///
/// Ordered so that rewrites of an unchanged map produce identical files.
pub type CacheMap = BTreeMap<String, CacheEntry>;

/// Counts reported by [`CacheStore::summary`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSummary {
    pub entries: usize,
    pub negative_entries: usize,
    pub oldest_timestamp_ms: Option<i64>,
}

/// Persistent cache of lookup results keyed by cache key.
///
/// Entries are never evicted; staleness is decided by readers.
pub struct CacheStore {
    path: PathBuf,
    entries: OnceCell<Mutex<CacheMap>>,
    /// Serializes file writes so the last save always holds the newest map.
    save_lock: tokio::sync::Mutex<()>,
}

impl CacheStore {
    /// Creates an unloaded store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: OnceCell::new(),
            save_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true once the file has been read (or found missing).
    pub fn is_loaded(&self) -> bool {
        self.entries.initialized()
    }

    /// Loads the cache file once; later calls return the same map.
    ///
    /// Never fails: a missing, unreadable or malformed file yields an empty
    /// cache.
    pub async fn load(&self) -> &Mutex<CacheMap> {
        self.entries
            .get_or_init(|| async { Mutex::new(read_cache_file(&self.path).await) })
            .await
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.load().await.lock().get(key).cloned()
    }

    /// Reads an entry without triggering a load.
    ///
    /// Returns `None` if the store has not been loaded yet.
    pub fn peek(&self, key: &str) -> Option<CacheEntry> {
        self.entries.get()?.lock().get(key).cloned()
    }

    /// Inserts or replaces an entry and rewrites the cache file.
    pub async fn put(&self, key: &str, entry: CacheEntry) {
        self.load().await.lock().insert(key.to_string(), entry);
        self.save().await;
    }

    /// Rewrites the cache file from the in-memory map.
    ///
    /// Does nothing if the store was never loaded. I/O errors are logged and
    /// swallowed.
    pub async fn save(&self) {
        let Some(entries) = self.entries.get() else {
            return;
        };

        let _guard = self.save_lock.lock().await;

        let bytes = {
            let map = entries.lock();
            serde_json::to_vec(&*map)
        };

        let bytes = match bytes {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to serialize geocode cache");
                return;
            }
        };

        match write_atomic(&self.path, &bytes).await {
            Ok(()) => debug!(path = %self.path.display(), bytes = bytes.len(), "Saved geocode cache"),
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to save geocode cache; continuing with in-memory copy"
            ),
        }
    }

    pub async fn len(&self) -> usize {
        self.load().await.lock().len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn summary(&self) -> StoreSummary {
        let map = self.load().await.lock();
        StoreSummary {
            entries: map.len(),
            negative_entries: map.values().filter(|e| e.value.is_negative()).count(),
            oldest_timestamp_ms: map.values().map(|e| e.timestamp_ms).min(),
        }
    }

    /// Drops every entry and deletes the cache file.
    ///
    /// # Returns
    ///
    /// The number of entries removed.
    pub async fn clear(&self) -> io::Result<usize> {
        let removed = {
            let mut map = self.load().await.lock();
            let removed = map.len();
            map.clear();
            removed
        };

        let _guard = self.save_lock.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        info!(path = %self.path.display(), removed, "Cleared geocode cache");
        Ok(removed)
    }
}

async fn read_cache_file(path: &Path) -> CacheMap {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No geocode cache file, starting empty");
            return CacheMap::new();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Unreadable geocode cache, starting empty");
            return CacheMap::new();
        }
    };

    // A literal `null` is treated like an empty file.
    match serde_json::from_slice::<Option<CacheMap>>(&bytes) {
        Ok(map) => {
            let map = map.unwrap_or_default();
            info!(path = %path.display(), entries = map.len(), "Loaded geocode cache");
            map
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed geocode cache, starting empty");
            CacheMap::new()
        }
    }
}

/// Writes `bytes` to a temporary sibling and renames it over `path`.
async fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let temp_path = temp_sibling(path);
    tokio::fs::write(&temp_path, bytes).await?;
    tokio::fs::rename(&temp_path, path).await
}

/// `<file name>.tmp` next to `path`, keeping the original extension.
fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
