//! Time-boxed snapshot of the catalog and pack index.
//!
//! Readers take the shared read lock and reuse a snapshot younger than the TTL. An expired
//! snapshot is replaced under `refresh_lock`, and the age is checked again after acquiring it,
//! so a burst of expired readers performs a single backing-store fetch.

use crate::catalog::Catalog;
use crate::store::CatalogStore;
use intake_protocol::PackIndexEntry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

pub const DEFAULT_CATALOG_TTL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct CatalogSnapshot {
    pub catalog: Catalog,
    /// Pack index entries keyed by pack id (= tag)
    pub packs: HashMap<String, PackIndexEntry>,
    pub loaded_at: Instant,
}

impl CatalogSnapshot {
    pub fn new(catalog: Catalog, packs: Vec<PackIndexEntry>, loaded_at: Instant) -> Self {
        let mut by_id = HashMap::with_capacity(packs.len());
        for entry in packs {
            by_id.entry(entry.id.clone()).or_insert(entry);
        }
        Self {
            catalog,
            packs: by_id,
            loaded_at,
        }
    }

    pub fn pack(&self, id: &str) -> Option<&PackIndexEntry> {
        self.packs.get(id)
    }
}

pub struct CatalogCache {
    store: Arc<dyn CatalogStore>,
    ttl: Duration,
    current: RwLock<Option<Arc<CatalogSnapshot>>>,
    refresh_lock: Mutex<()>,
}

impl CatalogCache {
    pub fn new(store: Arc<dyn CatalogStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    /// Returns the cached snapshot, refetching from the store when it is older than the TTL.
    pub fn get_or_refresh(&self, now: Instant) -> Arc<CatalogSnapshot> {
        if let Some(snapshot) = self.fresh(now) {
            return snapshot;
        }

        let _guard = self
            .refresh_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(snapshot) = self.fresh(now) {
            return snapshot;
        }

        let snapshot = Arc::new(self.fetch(now));
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        snapshot
    }

    fn fresh(&self, now: Instant) -> Option<Arc<CatalogSnapshot>> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        current
            .as_ref()
            .filter(|snapshot| now.saturating_duration_since(snapshot.loaded_at) < self.ttl)
            .cloned()
    }

    fn fetch(&self, now: Instant) -> CatalogSnapshot {
        let catalog = match self.store.load_catalog() {
            Ok(catalog) if catalog.is_empty() => {
                log::warn!("Catalog has no tags and no fallback entries");
                catalog
            }
            Ok(catalog) => catalog,
            Err(err) => {
                log::warn!("Catalog unavailable, serving empty catalog: {err}");
                Catalog::default()
            }
        };
        let packs = match self.store.load_pack_index() {
            Ok(index) => index.packs,
            Err(err) => {
                log::warn!("Pack index unavailable, serving without packs: {err}");
                Vec::new()
            }
        };
        log::debug!(
            "Catalog refreshed: {} tags, {} fallback entries, {} packs",
            catalog.tags.len(),
            catalog.fallback.len(),
            packs.len()
        );
        CatalogSnapshot::new(catalog, packs, now)
    }
}
