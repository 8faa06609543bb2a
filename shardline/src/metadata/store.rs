//! Metadata snapshot swapping.

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::info;

use super::Metadata;

/// Holds the current metadata snapshot.
///
/// Readers call [`MetadataStore::load`] once per statement and keep the
/// `Arc` they got, so a swap never changes metadata under an in-flight bind.
#[derive(Debug)]
pub struct MetadataStore {
    current: ArcSwap<Metadata>,
    lock: Mutex<()>,
}

impl Default for MetadataStore {
    fn default() -> Self {
        Self::new(Metadata::default())
    }
}

impl MetadataStore {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            current: ArcSwap::from_pointee(metadata),
            lock: Mutex::new(()),
        }
    }

    /// Current snapshot.
    pub fn load(&self) -> Arc<Metadata> {
        self.current.load_full()
    }

    /// Replace the snapshot. Returns the new version.
    pub fn swap(&self, mut metadata: Metadata) -> u64 {
        let _lock = self.lock.lock();
        metadata.version = self.current.load().version + 1;
        let version = metadata.version;
        self.current.store(Arc::new(metadata));
        info!("metadata snapshot {} published", version);
        version
    }

    /// Build a new snapshot from the current one and publish it.
    pub fn update(&self, f: impl FnOnce(&Metadata) -> Metadata) -> u64 {
        let _lock = self.lock.lock();
        let current = self.current.load_full();
        let mut metadata = f(&current);
        metadata.version = current.version + 1;
        let version = metadata.version;
        self.current.store(Arc::new(metadata));
        info!("metadata snapshot {} published", version);
        version
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::metadata::{DatabaseMetadata, MetadataProvider};

    #[test]
    fn test_swap_keeps_old_snapshot() {
        let store = MetadataStore::default();
        let before = store.load();
        assert_eq!(before.version(), 0);

        let version =
            store.swap(Metadata::new().with_database(DatabaseMetadata::new("logic_db", "public")));
        assert_eq!(version, 1);

        assert!(before.database("logic_db").is_none());
        assert!(store.load().database("logic_db").is_some());

        let version = store.update(|current| current.clone().with_enhanced_tables(["t_order"]));
        assert_eq!(version, 2);
        assert!(store.load().is_enhanced_table("logic_db", "t_order"));
        assert!(store.load().database("logic_db").is_some());
    }
}
