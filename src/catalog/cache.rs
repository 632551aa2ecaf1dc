//! Time-bounded partition catalog cache
//!
//! `CatalogCache` is the only component that talks to the remote catalog
//! source. Everyone else asks it for a [`Catalog`] and gets either a fresh
//! copy, a stale copy (when the refresh failed but something was cached), or
//! `CatalogUnavailable`.

use tracing::{info, warn};

use super::partition::Catalog;
use super::source::{CatalogSource, HttpCatalogSource};
use super::store::{CatalogStore, FsCatalogStore};
use crate::config::{Settings, CATALOG_TTL_SECS};
use crate::error::{HpcError, Result};

/// Source of "now", in epoch seconds
pub trait Clock {
    fn now(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[derive(Debug)]
struct Loaded {
    catalog: Catalog,
    refreshed_at: Option<i64>,
}

pub struct CatalogCache {
    source: Box<dyn CatalogSource>,
    store: Box<dyn CatalogStore>,
    clock: Box<dyn Clock>,
    ttl_secs: i64,
    current: Option<Loaded>,
}

impl CatalogCache {
    pub fn new(source: impl CatalogSource + 'static, store: impl CatalogStore + 'static) -> Self {
        Self {
            source: Box::new(source),
            store: Box::new(store),
            clock: Box::new(SystemClock),
            ttl_secs: CATALOG_TTL_SECS,
            current: None,
        }
    }

    /// HTTP source plus the file pair in the state directory
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let source = HttpCatalogSource::new(settings.catalog_url.clone())?;
        let store = FsCatalogStore::new(&settings.home);
        Ok(Self::new(source, store).with_ttl(settings.catalog_ttl_secs))
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_ttl(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// Return the catalog, refreshing first if it is missing or stale
    pub fn load(&mut self) -> Result<&Catalog> {
        if self.current.is_none() {
            self.current = self.read_local();
        }

        let needs_refresh = match &self.current {
            Some(loaded) => self.is_expired(loaded.refreshed_at),
            None => true,
        };

        if needs_refresh {
            if let Err(e) = self.fetch_and_store() {
                if self.current.is_none() {
                    return Err(HpcError::CatalogUnavailable(e.to_string()));
                }
                warn!(error = %e, "partition catalog refresh failed, using cached copy");
            }
        }

        self.current
            .as_ref()
            .map(|loaded| &loaded.catalog)
            .ok_or_else(|| HpcError::CatalogUnavailable("no partition data".to_string()))
    }

    /// Fetch the catalog unconditionally
    ///
    /// On any failure the persisted and in-memory copies are left as they
    /// were.
    pub fn refresh(&mut self) -> Result<&Catalog> {
        self.fetch_and_store()?;
        self.current
            .as_ref()
            .map(|loaded| &loaded.catalog)
            .ok_or_else(|| HpcError::CatalogUnavailable("no partition data".to_string()))
    }

    /// Timestamp of the copy currently held in memory
    pub fn refreshed_at(&self) -> Option<i64> {
        self.current.as_ref().and_then(|loaded| loaded.refreshed_at)
    }

    fn is_expired(&self, refreshed_at: Option<i64>) -> bool {
        match refreshed_at {
            Some(ts) => self.clock.now().saturating_sub(ts) >= self.ttl_secs,
            None => true,
        }
    }

    fn read_local(&self) -> Option<Loaded> {
        let stored = match self.store.read() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "cannot read cached partition catalog");
                return None;
            }
        };

        let payload = stored.payload?;
        match Catalog::from_json(&payload) {
            Ok(catalog) => {
                warn_on_claim_aliases(&catalog);
                Some(Loaded {
                    catalog,
                    refreshed_at: stored.refreshed_at,
                })
            }
            Err(e) => {
                warn!(error = %e, "cached partition catalog is unreadable, ignoring it");
                None
            }
        }
    }

    fn fetch_and_store(&mut self) -> Result<()> {
        let payload = self.source.fetch()?;
        let catalog = Catalog::from_json(&payload).map_err(|e| HpcError::FetchFailed(e.to_string()))?;

        let now = self.clock.now();
        self.store.write(&payload, now)?;

        info!(partitions = catalog.len(), "partition catalog updated");
        warn_on_claim_aliases(&catalog);
        self.current = Some(Loaded {
            catalog,
            refreshed_at: Some(now),
        });
        Ok(())
    }
}

fn warn_on_claim_aliases(catalog: &Catalog) {
    for (claim, partitions) in catalog.default_claim_aliases() {
        warn!(
            claim = %claim,
            partitions = %partitions.join(", "),
            "partitions share one default volume name"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::catalog::store::MemoryCatalogStore;

    const PAYLOAD_A: &str = r#"[{"Name": "x86", "CPULimit": 16, "MemoryLimit": 64}]"#;
    const PAYLOAD_B: &str = r#"[{"Name": "x86", "CPULimit": 16, "MemoryLimit": 64},
                                {"Name": "arm", "CPULimit": 8, "MemoryLimit": 32}]"#;

    const NOW: i64 = 1_700_000_000;
    const DAY: i64 = 86_400;

    /// Serves a fixed payload (or an error) and counts fetches
    #[derive(Clone)]
    struct FakeSource {
        payload: Option<&'static str>,
        fetches: Rc<Cell<usize>>,
    }

    impl FakeSource {
        fn serving(payload: &'static str) -> Self {
            Self {
                payload: Some(payload),
                fetches: Rc::new(Cell::new(0)),
            }
        }

        fn failing() -> Self {
            Self {
                payload: None,
                fetches: Rc::new(Cell::new(0)),
            }
        }
    }

    impl CatalogSource for FakeSource {
        fn fetch(&self) -> Result<Vec<u8>> {
            self.fetches.set(self.fetches.get() + 1);
            self.payload
                .map(|p| p.as_bytes().to_vec())
                .ok_or_else(|| HpcError::FetchFailed("connection refused".to_string()))
        }
    }

    struct FixedClock(i64);

    impl Clock for FixedClock {
        fn now(&self) -> i64 {
            self.0
        }
    }

    fn cache(source: FakeSource, store: MemoryCatalogStore) -> CatalogCache {
        CatalogCache::new(source, store).with_clock(FixedClock(NOW))
    }

    #[test]
    fn test_load_without_cache_fetches() {
        let source = FakeSource::serving(PAYLOAD_A);
        let store = MemoryCatalogStore::new();
        let mut cache = cache(source.clone(), store.clone());

        let catalog = cache.load().unwrap();
        assert!(catalog.find("x86").is_some());
        assert_eq!(source.fetches.get(), 1);

        let stored = store.snapshot();
        assert_eq!(stored.payload.as_deref(), Some(PAYLOAD_A.as_bytes()));
        assert_eq!(stored.refreshed_at, Some(NOW));
        assert_eq!(cache.refreshed_at(), Some(NOW));
    }

    #[test]
    fn test_load_fresh_cache_skips_fetch() {
        let source = FakeSource::serving(PAYLOAD_B);
        let store = MemoryCatalogStore::with_contents(PAYLOAD_A, Some(NOW - DAY + 1));
        let mut cache = cache(source.clone(), store);

        assert_eq!(cache.load().unwrap().len(), 1);
        assert_eq!(source.fetches.get(), 0);
    }

    #[test]
    fn test_load_stale_cache_refreshes() {
        let source = FakeSource::serving(PAYLOAD_B);
        let store = MemoryCatalogStore::with_contents(PAYLOAD_A, Some(NOW - DAY));
        let mut cache = cache(source.clone(), store.clone());

        assert_eq!(cache.load().unwrap().len(), 2);
        assert_eq!(source.fetches.get(), 1);
        assert_eq!(store.snapshot().refreshed_at, Some(NOW));
    }

    #[test]
    fn test_missing_timestamp_is_infinitely_stale() {
        let source = FakeSource::serving(PAYLOAD_B);
        let store = MemoryCatalogStore::with_contents(PAYLOAD_A, None);
        let mut cache = cache(source.clone(), store);

        assert_eq!(cache.load().unwrap().len(), 2);
        assert_eq!(source.fetches.get(), 1);
    }

    #[test]
    fn test_stale_cache_survives_fetch_failure() {
        let store = MemoryCatalogStore::with_contents(PAYLOAD_A, Some(NOW - 3 * DAY));
        let mut cache = cache(FakeSource::failing(), store.clone());

        let catalog = cache.load().unwrap();
        assert!(catalog.find("x86").is_some());
        assert_eq!(cache.refreshed_at(), Some(NOW - 3 * DAY));
    }

    #[test]
    fn test_no_cache_and_fetch_failure_is_unavailable() {
        let mut cache = cache(FakeSource::failing(), MemoryCatalogStore::new());
        assert!(matches!(cache.load(), Err(HpcError::CatalogUnavailable(_))));
    }

    #[test]
    fn test_failed_refresh_preserves_previous_state() {
        let store = MemoryCatalogStore::with_contents(PAYLOAD_A, Some(NOW - 10));
        let before = store.snapshot();
        let mut cache = cache(FakeSource::failing(), store.clone());

        assert!(matches!(cache.refresh(), Err(HpcError::FetchFailed(_))));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_malformed_payload_is_not_persisted() {
        let store = MemoryCatalogStore::with_contents(PAYLOAD_A, Some(NOW - 10));
        let before = store.snapshot();
        let mut cache = cache(FakeSource::serving("[{\"Name\": \"x86\", \"CPUL"), store.clone());

        assert!(matches!(cache.refresh(), Err(HpcError::FetchFailed(_))));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_write_failure_keeps_memory_and_disk_in_step() {
        let store = MemoryCatalogStore::with_contents(PAYLOAD_A, Some(NOW - 2 * DAY));
        store.set_read_only(true);
        let mut cache = cache(FakeSource::serving(PAYLOAD_B), store.clone());

        assert!(matches!(cache.refresh(), Err(HpcError::WriteFailed(_))));
        // The new fetch must not surface in memory either
        assert_eq!(cache.load().unwrap().len(), 1);
        assert_eq!(store.snapshot().payload.as_deref(), Some(PAYLOAD_A.as_bytes()));
    }

    #[test]
    fn test_corrupt_cache_without_network_is_unavailable() {
        let store = MemoryCatalogStore::with_contents("not json", Some(NOW));
        let mut cache = cache(FakeSource::failing(), store);
        assert!(matches!(cache.load(), Err(HpcError::CatalogUnavailable(_))));
    }

    #[test]
    fn test_fs_backed_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsCatalogStore::new(dir.path());
        let mut cache = CatalogCache::new(FakeSource::serving(PAYLOAD_A), store.clone())
            .with_clock(FixedClock(NOW));
        cache.load().unwrap();

        // A second process with no network sees the persisted copy
        let mut offline = CatalogCache::new(FakeSource::failing(), store).with_clock(FixedClock(NOW + 60));
        assert!(offline.load().unwrap().find("x86").is_some());
        assert_eq!(offline.refreshed_at(), Some(NOW));
    }
}
