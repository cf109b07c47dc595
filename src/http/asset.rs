//! Cached asset handlers.
//!
//! # Responsibilities
//! - Serve one class of in-memory asset under a pathname predicate
//! - Attach a fixed Content-Type and Cache-Control per class
//!
//! # Design Decisions
//! - The resolver runs per request against the request's pinned snapshot,
//!   never at construction time
//! - A predicate hit with no bytes in the snapshot falls through (404),
//!   it is not an error

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use bytes::Bytes;
use std::sync::Arc;

use crate::assets::{AssetCache, AssetStore};
use crate::config::CacheConfig;
use crate::error::SsrError;
use crate::http::chain::{Flow, Handler};
use crate::http::request::SsrRequest;
use crate::http::response::SsrResponse;

pub const HTML: &str = "text/html";
pub const JAVASCRIPT: &str = "application/javascript";

pub const INDEX_PATH: &str = "/";
pub const SERVICE_WORKER_PATH: &str = "/service-worker.js";
pub const CHUNK_PREFIX: &str = crate::assets::manifest::CLIENT_PREFIX;

type Predicate = Box<dyn Fn(&str) -> bool + Send + Sync>;
type Resolver = Box<dyn Fn(&AssetCache, &str) -> Option<Bytes> + Send + Sync>;

/// Serves bytes from the asset snapshot for pathnames the predicate accepts.
pub struct AssetHandler {
    predicate: Predicate,
    content_type: String,
    cache_control: String,
    resolver: Resolver,
    store: Arc<AssetStore>,
}

/// Predicate matching exactly one pathname.
pub fn exact(path: &'static str) -> impl Fn(&str) -> bool + Send + Sync {
    move |pathname| pathname == path
}

/// Predicate matching every pathname under a prefix.
pub fn prefix(prefix: &'static str) -> impl Fn(&str) -> bool + Send + Sync {
    move |pathname| pathname.starts_with(prefix)
}

impl AssetHandler {
    pub fn new(
        store: Arc<AssetStore>,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
        content_type: impl Into<String>,
        cache_control: impl Into<String>,
        resolver: impl Fn(&AssetCache, &str) -> Option<Bytes> + Send + Sync + 'static,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            content_type: content_type.into(),
            cache_control: cache_control.into(),
            resolver: Box::new(resolver),
            store,
        }
    }

    /// Root document at `/`.
    pub fn index(store: Arc<AssetStore>, cache_control: &str) -> Self {
        Self::new(store, exact(INDEX_PATH), HTML, cache_control, |cache, _| {
            cache.client.index.clone()
        })
    }

    /// Service worker script.
    pub fn service_worker(store: Arc<AssetStore>, cache_control: &str) -> Self {
        Self::new(store, exact(SERVICE_WORKER_PATH), JAVASCRIPT, cache_control, |cache, _| {
            cache.client.service_worker.clone()
        })
    }

    /// Hashed client chunks under `/client/`.
    pub fn chunks(store: Arc<AssetStore>, cache_control: &str) -> Self {
        Self::new(store, prefix(CHUNK_PREFIX), JAVASCRIPT, cache_control, |cache, pathname| {
            cache.chunk(pathname)
        })
    }

    /// The three standard asset stages, in serving order.
    pub fn standard(store: &Arc<AssetStore>, cache: &CacheConfig) -> Vec<Self> {
        vec![
            Self::index(store.clone(), &cache.index),
            Self::service_worker(store.clone(), &cache.service_worker),
            Self::chunks(store.clone(), &cache.chunks),
        ]
    }
}

#[async_trait]
impl Handler for AssetHandler {
    async fn handle(&self, req: &mut SsrRequest, res: &mut SsrResponse) -> Result<Flow, SsrError> {
        if !(self.predicate)(&req.pathname) {
            return Ok(Flow::Next);
        }

        let assets = match req.assets() {
            Some(assets) => assets.clone(),
            None => self.store.ready().await,
        };

        let Some(body) = (self.resolver)(&assets, &req.pathname) else {
            tracing::debug!(pathname = %req.pathname, "Asset not in snapshot");
            return Ok(Flow::Next);
        };

        tracing::debug!(pathname = %req.pathname, bytes = body.len(), "Serving cached asset");
        res.set_status(StatusCode::OK);
        res.set_content_type(&self.content_type);
        res.set_header(header::CACHE_CONTROL, &self.cache_control);
        res.end(body);
        Ok(Flow::Handled)
    }
}
