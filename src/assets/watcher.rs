//! Build-output watcher for development mode.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::assets::manifest::load_manifest;
use crate::assets::store::AssetStore;

/// Watches the bundler's output directory and installs a fresh snapshot
/// whenever the build changes.
pub struct ManifestWatcher {
    output_dir: PathBuf,
    store: Arc<AssetStore>,
}

impl ManifestWatcher {
    pub fn new(output_dir: &Path, store: Arc<AssetStore>) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
            store,
        }
    }

    /// Try to load whatever build is already on disk. A missing or partial
    /// build is not fatal in dev mode; the watcher picks up the next one.
    pub fn initial_build(&self) -> bool {
        reload(&self.output_dir, &self.store)
    }

    /// Start watching in a background thread. The returned watcher must be
    /// kept alive for events to keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        // The build may not have produced anything yet.
        fs::create_dir_all(&self.output_dir).map_err(notify::Error::io)?;

        let store = self.store.clone();
        let output_dir = self.output_dir.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Build output changed, reloading assets...");
                        reload(&output_dir, &store);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.output_dir, RecursiveMode::Recursive)?;

        tracing::info!(path = ?self.output_dir, "Build output watcher started");
        Ok(watcher)
    }
}

fn reload(output_dir: &Path, store: &AssetStore) -> bool {
    match load_manifest(output_dir) {
        Ok(cache) => {
            store.install(cache);
            true
        }
        Err(e) => {
            tracing::warn!(
                "Failed to load build output: {}. Keeping current assets.",
                e
            );
            false
        }
    }
}
