//! Compiled asset subsystem.
//!
//! # Data Flow
//! ```text
//! Production startup:
//!     output_dir → manifest.rs (client.json + server.json + chunks)
//!     → AssetCache → store.rs (installed once)
//!
//! Development:
//!     bundler writes output_dir
//!     → watcher.rs (notify event)
//!     → manifest.rs reload
//!     → store.rs atomic swap, version + 1
//!
//! Request path:
//!     store.ready() → Arc<AssetCache> pinned on the request
//! ```
//!
//! # Design Decisions
//! - Snapshots are immutable; rebuilds replace, never patch
//! - A failed reload keeps serving the previous snapshot
//! - No snapshot isolation across a request beyond the pinned `Arc`

pub mod cache;
pub mod manifest;
pub mod store;
pub mod watcher;

pub use cache::{AssetCache, ClientAssets, ServerAssets};
pub use manifest::{load_manifest, ManifestError};
pub use store::AssetStore;
pub use watcher::ManifestWatcher;
