//! Versioned, time-bounded persistent cache in front of a [`PlaceSource`].
//!
//! Two keys are kept per version: `<namespace>-<version>` holds the JSON list of places
//! and `<namespace>-timestamp-<version>` the write time in epoch milliseconds. Bumping
//! the version tag orphans older entries, which are purged on the next access.

use tokio::sync::Mutex;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::db::KeyValueStore;
use crate::error::{FetchError, StoreError};
use crate::places::{Place, PlaceSource};
use crate::TARGET_CACHE;

pub const DEFAULT_NAMESPACE: &str = "dime-places-cache";
pub const DEFAULT_VERSION: &str = "v11-sede-in-parentheses";
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

/// A stored list of places and the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub places: Vec<Place>,
    pub timestamp_ms: i64,
}

impl CacheEntry {
    pub fn is_fresh(&self, now_ms: i64, ttl: Duration) -> bool {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now_ms.saturating_sub(self.timestamp_ms) < ttl_ms
    }
}

pub struct PlaceCache<S> {
    store: S,
    namespace: String,
    version: String,
    ttl: Duration,
    // serializes the read-modify-write of a whole call
    lock: Mutex<()>,
}

impl<S: KeyValueStore> PlaceCache<S> {
    pub fn new(
        store: S,
        namespace: impl Into<String>,
        version: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            namespace: namespace.into(),
            version: version.into(),
            ttl,
            lock: Mutex::new(()),
        }
    }

    /// Cache over `store` with the default namespace and version tag.
    pub fn with_ttl(store: S, ttl: Duration) -> Self {
        Self::new(store, DEFAULT_NAMESPACE, DEFAULT_VERSION, ttl)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn data_key(&self) -> String {
        format!("{}-{}", self.namespace, self.version)
    }

    pub fn timestamp_key(&self) -> String {
        format!("{}-timestamp-{}", self.namespace, self.version)
    }

    /// Reads the current-version entry regardless of its age.
    ///
    /// Storage failures and undecodable data read as a miss. A missing or unparseable
    /// timestamp makes the entry infinitely stale but still usable.
    pub async fn get(&self) -> Option<CacheEntry> {
        let raw = match self.store.get(&self.data_key()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(target: TARGET_CACHE, "Failed to read cache entry: {}", e);
                return None;
            }
        };

        let places: Vec<Place> = match serde_json::from_str(&raw) {
            Ok(places) => places,
            Err(e) => {
                warn!(target: TARGET_CACHE, "Discarding undecodable cache entry: {}", e);
                return None;
            }
        };

        let timestamp_ms = match self.store.get(&self.timestamp_key()).await {
            Ok(Some(raw)) => raw.trim().parse().unwrap_or(i64::MIN),
            Ok(None) => i64::MIN,
            Err(e) => {
                warn!(target: TARGET_CACHE, "Failed to read cache timestamp: {}", e);
                i64::MIN
            }
        };

        Some(CacheEntry {
            places,
            timestamp_ms,
        })
    }

    pub async fn put(&self, places: &[Place], now_ms: i64) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(places)?;
        self.store.set(&self.data_key(), &serialized).await?;
        self.store
            .set(&self.timestamp_key(), &now_ms.to_string())
            .await?;
        debug!(target: TARGET_CACHE, "Cached {} places at {}", places.len(), now_ms);
        Ok(())
    }

    /// Removes every key in the namespace that belongs to another version.
    pub async fn invalidate_older_versions(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for key in self.store.keys_with_prefix(&self.namespace).await? {
            if !key.contains(&self.version) {
                self.store.remove(&key).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            info!(target: TARGET_CACHE, "Purged {} cache keys from older versions", removed);
        }
        Ok(removed)
    }

    /// Removes every key in the namespace, current version included.
    pub async fn clear(&self) -> Result<usize, StoreError> {
        let _guard = self.lock.lock().await;
        let keys = self.store.keys_with_prefix(&self.namespace).await?;
        for key in &keys {
            self.store.remove(key).await?;
        }
        info!(target: TARGET_CACHE, "Cleared {} cache keys", keys.len());
        Ok(keys.len())
    }

    pub async fn fetch_places_cached<P: PlaceSource>(
        &self,
        source: &P,
    ) -> Result<Vec<Place>, FetchError> {
        self.fetch_places_cached_at(source, chrono::Utc::now().timestamp_millis())
            .await
    }

    /// Same as [`Self::fetch_places_cached`] with an explicit wall clock.
    pub async fn fetch_places_cached_at<P: PlaceSource>(
        &self,
        source: &P,
        now_ms: i64,
    ) -> Result<Vec<Place>, FetchError> {
        let _guard = self.lock.lock().await;

        if let Err(e) = self.invalidate_older_versions().await {
            warn!(target: TARGET_CACHE, "Failed to purge older cache versions: {}", e);
        }

        let cached = self.get().await;
        if let Some(entry) = &cached {
            if entry.is_fresh(now_ms, self.ttl) {
                debug!(
                    target: TARGET_CACHE,
                    "Serving {} places from cache ({} ms old)",
                    entry.places.len(),
                    now_ms.saturating_sub(entry.timestamp_ms)
                );
                return Ok(entry.places.clone());
            }
        }

        match source.fetch_places().await {
            Ok(places) => {
                if places.is_empty() {
                    info!(target: TARGET_CACHE, "Fetched an empty place list, not caching it");
                } else if let Err(e) = self.put(&places, now_ms).await {
                    warn!(target: TARGET_CACHE, "Failed to write cache entry: {}", e);
                }
                Ok(places)
            }
            Err(e) => match cached {
                Some(entry) => {
                    warn!(
                        target: TARGET_CACHE,
                        "Fetch failed ({}), serving {} stale cached places",
                        e,
                        entry.places.len()
                    );
                    Ok(entry.places)
                }
                None => Err(e),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::places::Location;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const T: i64 = 1_700_000_000_000;
    const TTL_MS: i64 = 300_000;

    fn place(id: u64, name: &str) -> Place {
        Place {
            id,
            name: name.to_string(),
            category: "Cultura".to_string(),
            location: Location {
                lat: 9.52,
                lng: -75.58,
            },
            address: "Zone: Urbana".to_string(),
        }
    }

    #[derive(Default)]
    struct StubSource {
        calls: AtomicUsize,
        fail: AtomicBool,
        empty: AtomicBool,
    }

    impl StubSource {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PlaceSource for StubSource {
        async fn fetch_places(&self) -> Result<Vec<Place>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(FetchError::BackendRejected("down".to_string()));
            }
            if self.empty.load(Ordering::SeqCst) {
                return Ok(Vec::new());
            }
            Ok(vec![place(call as u64, &format!("fetch {}", call))])
        }
    }

    struct BrokenStore;

    fn broken() -> StoreError {
        StoreError::Serialization(serde_json::from_str::<i32>("nope").unwrap_err())
    }

    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(broken())
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(broken())
        }
        async fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(broken())
        }
        async fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>, StoreError> {
            Err(broken())
        }
    }

    fn cache() -> PlaceCache<MemoryStore> {
        PlaceCache::with_ttl(MemoryStore::new(), DEFAULT_TTL)
    }

    #[test]
    fn test_keys() {
        let cache = cache();
        assert_eq!(cache.data_key(), "dime-places-cache-v11-sede-in-parentheses");
        assert_eq!(
            cache.timestamp_key(),
            "dime-places-cache-timestamp-v11-sede-in-parentheses"
        );
    }

    #[test]
    fn test_huge_ttl_keeps_entry_fresh() {
        let entry = CacheEntry {
            places: Vec::new(),
            timestamp_ms: T,
        };
        assert!(entry.is_fresh(T + TTL_MS * 1_000, Duration::from_secs(u64::MAX)));
        assert!(entry.is_fresh(T + TTL_MS - 1, DEFAULT_TTL));
        assert!(!entry.is_fresh(T + TTL_MS, DEFAULT_TTL));
    }

    #[tokio::test]
    async fn test_ttl_boundary() {
        let cache = cache();
        let source = StubSource::default();

        let first = cache.fetch_places_cached_at(&source, T).await.unwrap();
        assert_eq!(source.calls(), 1);

        let cached = cache
            .fetch_places_cached_at(&source, T + TTL_MS - 1)
            .await
            .unwrap();
        assert_eq!(cached, first);
        assert_eq!(source.calls(), 1);

        let refreshed = cache
            .fetch_places_cached_at(&source, T + TTL_MS + 1)
            .await
            .unwrap();
        assert_eq!(source.calls(), 2);
        assert_eq!(refreshed[0].name, "fetch 2");

        let stored = cache.get().await.unwrap();
        assert_eq!(stored.timestamp_ms, T + TTL_MS + 1);
    }

    #[tokio::test]
    async fn test_stale_entry_served_on_failure() {
        let cache = cache();
        let source = StubSource::default();
        let first = cache.fetch_places_cached_at(&source, T).await.unwrap();

        source.fail.store(true, Ordering::SeqCst);
        let stale = cache
            .fetch_places_cached_at(&source, T + 10 * TTL_MS)
            .await
            .unwrap();
        assert_eq!(stale, first);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_without_entry_propagates() {
        let cache = cache();
        let source = StubSource::default();
        source.fail.store(true, Ordering::SeqCst);

        let result = cache.fetch_places_cached_at(&source, T).await;
        assert!(matches!(result, Err(FetchError::BackendRejected(_))));
    }

    #[tokio::test]
    async fn test_empty_result_is_not_cached() {
        let cache = cache();
        let source = StubSource::default();
        source.empty.store(true, Ordering::SeqCst);

        assert!(cache.fetch_places_cached_at(&source, T).await.unwrap().is_empty());
        assert!(cache.get().await.is_none());
        assert!(cache.store().is_empty());

        // the next call fetches again instead of serving the empty list
        source.empty.store(false, Ordering::SeqCst);
        let places = cache.fetch_places_cached_at(&source, T + 1).await.unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_older_versions_are_purged() {
        let store = MemoryStore::new();
        store.set("dime-places-cache-v10-old", "[]").await.unwrap();
        store.set("dime-places-cache-timestamp-v10-old", "1").await.unwrap();
        store.set("unrelated-key", "keep").await.unwrap();

        let cache = PlaceCache::with_ttl(store.clone(), DEFAULT_TTL);
        cache
            .fetch_places_cached_at(&StubSource::default(), T)
            .await
            .unwrap();

        let keys = store.keys_with_prefix("").await.unwrap();
        assert_eq!(
            keys,
            vec![
                "dime-places-cache-timestamp-v11-sede-in-parentheses",
                "dime-places-cache-v11-sede-in-parentheses",
                "unrelated-key",
            ]
        );
    }

    #[tokio::test]
    async fn test_entry_without_timestamp_is_stale() {
        let store = MemoryStore::new();
        let cache = PlaceCache::with_ttl(store.clone(), DEFAULT_TTL);
        let seeded = vec![place(9, "seeded")];
        store
            .set(&cache.data_key(), &serde_json::to_string(&seeded).unwrap())
            .await
            .unwrap();

        let source = StubSource::default();
        source.fail.store(true, Ordering::SeqCst);
        let places = cache.fetch_places_cached_at(&source, T).await.unwrap();
        assert_eq!(places, seeded);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_broken_store_degrades_to_plain_fetch() {
        let cache = PlaceCache::with_ttl(BrokenStore, DEFAULT_TTL);
        let source = StubSource::default();
        let places = cache.fetch_places_cached_at(&source, T).await.unwrap();
        assert_eq!(places.len(), 1);
        cache.fetch_places_cached_at(&source, T + 1).await.unwrap();
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_fetch() {
        let cache = cache();
        let source = StubSource::default();
        let (a, b) = tokio::join!(
            cache.fetch_places_cached_at(&source, T),
            cache.fetch_places_cached_at(&source, T)
        );
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_clear_removes_current_version() {
        let cache = cache();
        cache
            .fetch_places_cached_at(&StubSource::default(), T)
            .await
            .unwrap();
        assert_eq!(cache.clear().await.unwrap(), 2);
        assert!(cache.get().await.is_none());
    }
}
