//! Build-manifest loading.
//!
//! Synthesizes an [`AssetCache`] from the bundler's output directory:
//!
//! ```text
//! <output_dir>/
//!     client.json          {"main": "...", "routes": {...}, "chunks": [...]}
//!     server.json          {"entry": "..."}
//!     client/<chunk>       served at /client/<chunk>
//!     index.html           optional root document
//!     service-worker.js    optional
//! ```

use bytes::Bytes;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::assets::cache::{AssetCache, ClientAssets, ServerAssets};

/// Public pathname prefix of client chunks.
pub const CLIENT_PREFIX: &str = "/client/";

pub const CLIENT_MANIFEST: &str = "client.json";
pub const SERVER_MANIFEST: &str = "server.json";

/// Errors raised while reading build output.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ClientManifest {
    main: String,
    #[serde(default)]
    routes: HashMap<String, String>,
    #[serde(default)]
    chunks: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ServerManifest {
    entry: String,
}

/// Public pathname for a file in the client output directory.
pub fn client_path(file: &str) -> String {
    format!("{}{}", CLIENT_PREFIX, file.trim_start_matches('/'))
}

/// Read both manifests and every referenced chunk into a new snapshot.
pub fn load_manifest(output_dir: &Path) -> Result<AssetCache, ManifestError> {
    let client: ClientManifest = read_json(&output_dir.join(CLIENT_MANIFEST))?;
    let server: ServerManifest = read_json(&output_dir.join(SERVER_MANIFEST))?;

    let client_dir = output_dir.join("client");
    let mut chunks = HashMap::with_capacity(client.chunks.len());
    for file in &client.chunks {
        let bytes = read_bytes(&client_dir.join(file))?;
        chunks.insert(client_path(file), bytes);
    }

    let routes = client
        .routes
        .iter()
        .map(|(id, file)| (id.clone(), client_path(file)))
        .collect();

    let cache = AssetCache {
        client: ClientAssets {
            index: read_optional(&output_dir.join("index.html"))?,
            service_worker: read_optional(&output_dir.join("service-worker.js"))?,
            chunks,
            main_file: client_path(&client.main),
            routes,
        },
        server: ServerAssets {
            entry: server.entry,
        },
        version: 0,
    };

    tracing::debug!(
        output_dir = %output_dir.display(),
        chunks = cache.client.chunks.len(),
        routes = cache.client.routes.len(),
        entry = %cache.server.entry,
        "Build manifest loaded"
    );
    Ok(cache)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ManifestError> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_bytes(path: &Path) -> Result<Bytes, ManifestError> {
    fs::read(path)
        .map(Bytes::from)
        .map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })
}

fn read_optional(path: &Path) -> Result<Option<Bytes>, ManifestError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(Bytes::from(bytes))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ManifestError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_build(dir: &Path) {
        write(
            dir,
            CLIENT_MANIFEST,
            r#"{"main": "main.1a2b.js",
                "routes": {"about": "about.3c4d.js"},
                "chunks": ["main.1a2b.js", "about.3c4d.js"]}"#,
        );
        write(dir, SERVER_MANIFEST, r#"{"entry": "server.5e6f.js"}"#);
        write(dir, "client/main.1a2b.js", "console.log('main')");
        write(dir, "client/about.3c4d.js", "console.log('about')");
    }

    #[test]
    fn loads_complete_build() {
        let dir = tempfile::tempdir().unwrap();
        sample_build(dir.path());
        write(dir.path(), "index.html", "<html></html>");

        let cache = load_manifest(dir.path()).unwrap();
        assert_eq!(cache.client.main_file, "/client/main.1a2b.js");
        assert_eq!(cache.route_bundle("about"), Some("/client/about.3c4d.js"));
        assert_eq!(
            cache.chunk("/client/about.3c4d.js").unwrap(),
            Bytes::from_static(b"console.log('about')")
        );
        assert_eq!(cache.client.index.as_deref(), Some(&b"<html></html>"[..]));
        assert!(cache.client.service_worker.is_none());
        assert_eq!(cache.server.entry, "server.5e6f.js");
    }

    #[test]
    fn missing_chunk_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        sample_build(dir.path());
        fs::remove_file(dir.path().join("client/about.3c4d.js")).unwrap();

        let err = load_manifest(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Read { .. }));
    }

    #[test]
    fn malformed_manifest_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        sample_build(dir.path());
        write(dir.path(), SERVER_MANIFEST, "{");

        let err = load_manifest(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Parse { .. }));
    }
}
