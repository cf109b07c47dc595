//! Current-snapshot holder.
//!
//! # Responsibilities
//! - Hold the one "current" [`AssetCache`]
//! - Swap in rebuilt snapshots atomically, stamping each with a version
//! - Let readers wait for the first snapshot (dev mode)
//!
//! # Design Decisions
//! - `ArcSwapOption` so readers never block writers and vice versa
//! - Requests pin the `Arc` they loaded; a concurrent rebuild does not
//!   change what an in-flight request sees

use arc_swap::ArcSwapOption;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

use crate::assets::cache::AssetCache;

/// Process-wide store for the active asset snapshot.
#[derive(Debug, Default)]
pub struct AssetStore {
    current: ArcSwapOption<AssetCache>,
    versions: AtomicU64,
    installed: Notify,
}

impl AssetStore {
    /// Create an empty store. Readers of [`AssetStore::ready`] wait until
    /// the first [`AssetStore::install`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a snapshot (production startup).
    pub fn with_snapshot(cache: AssetCache) -> Self {
        let store = Self::new();
        store.install(cache);
        store
    }

    /// Replace the current snapshot and wake anyone waiting for the first
    /// build. Returns the version assigned to the new snapshot.
    pub fn install(&self, mut cache: AssetCache) -> u64 {
        let version = self.versions.fetch_add(1, Ordering::SeqCst) + 1;
        cache.version = version;
        self.current.store(Some(Arc::new(cache)));
        self.installed.notify_waiters();
        crate::observability::metrics::record_snapshot_install(version);
        tracing::info!(version, "Asset snapshot installed");
        version
    }

    /// The current snapshot, if one has been built.
    pub fn current(&self) -> Option<Arc<AssetCache>> {
        self.current.load_full()
    }

    /// Resolve to the current snapshot, waiting for the first install if
    /// nothing has been built yet.
    pub async fn ready(&self) -> Arc<AssetCache> {
        loop {
            let notified = self.installed.notified();
            if let Some(cache) = self.current() {
                return cache;
            }
            notified.await;
        }
    }
}
