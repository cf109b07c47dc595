//! Asset cache snapshot.
//!
//! One `AssetCache` is the complete, immutable result of a build: client
//! documents and chunks held in memory plus the identifiers the dispatcher
//! needs for preload hints. Snapshots are never mutated; a rebuild produces a
//! new one which the store swaps in.

use bytes::Bytes;
use std::collections::HashMap;

/// Compiled client-side artifacts.
#[derive(Debug, Clone, Default)]
pub struct ClientAssets {
    /// Root document served at `/`.
    pub index: Option<Bytes>,
    /// Service worker script.
    pub service_worker: Option<Bytes>,
    /// Request pathname → chunk bytes.
    pub chunks: HashMap<String, Bytes>,
    /// Pathname of the entry script.
    pub main_file: String,
    /// Route id → pathname of the route's client bundle.
    pub routes: HashMap<String, String>,
}

/// Compiled server-side artifacts.
#[derive(Debug, Clone, Default)]
pub struct ServerAssets {
    /// Identifier of the server bundle the module registry was built from.
    pub entry: String,
}

/// A complete build snapshot.
#[derive(Debug, Clone, Default)]
pub struct AssetCache {
    pub client: ClientAssets,
    pub server: ServerAssets,
    /// Assigned by the store on install; 0 for snapshots not yet installed.
    pub version: u64,
}

impl AssetCache {
    /// Look up a hashed chunk by its request pathname.
    pub fn chunk(&self, pathname: &str) -> Option<Bytes> {
        self.client.chunks.get(pathname).cloned()
    }

    /// Client bundle for a route, if the build produced one.
    pub fn route_bundle(&self, route_id: &str) -> Option<&str> {
        self.client.routes.get(route_id).map(String::as_str)
    }

    /// `<script>` tag loading the entry script.
    pub fn main_script_tag(&self) -> String {
        format!("<script src='{}'></script>", self.client.main_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_lookup_is_by_full_pathname() {
        let mut cache = AssetCache::default();
        cache
            .client
            .chunks
            .insert("/client/app.abcd1234.js".into(), Bytes::from_static(b"x"));

        assert!(cache.chunk("/client/app.abcd1234.js").is_some());
        assert!(cache.chunk("app.abcd1234.js").is_none());
    }

    #[test]
    fn main_script_tag_uses_main_file() {
        let mut cache = AssetCache::default();
        cache.client.main_file = "/client/main.js".into();
        assert_eq!(cache.main_script_tag(), "<script src='/client/main.js'></script>");
    }
}
