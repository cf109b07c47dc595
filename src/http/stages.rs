//! Entry stages run before any asset or route lookup.

use async_trait::async_trait;
use std::sync::Arc;

use crate::assets::AssetStore;
use crate::error::SsrError;
use crate::http::chain::{Flow, Handler};
use crate::http::request::SsrRequest;
use crate::http::response::SsrResponse;

/// Derives `pathname` and `query` from the raw URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalize;

#[async_trait]
impl Handler for Normalize {
    async fn handle(&self, req: &mut SsrRequest, _res: &mut SsrResponse) -> Result<Flow, SsrError> {
        req.normalize();
        Ok(Flow::Next)
    }
}

/// Pins the current asset snapshot on the request, waiting for the first
/// build when none exists yet.
#[derive(Debug, Clone)]
pub struct PinAssets {
    store: Arc<AssetStore>,
}

impl PinAssets {
    pub fn new(store: Arc<AssetStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Handler for PinAssets {
    async fn handle(&self, req: &mut SsrRequest, _res: &mut SsrResponse) -> Result<Flow, SsrError> {
        let assets = self.store.ready().await;
        tracing::trace!(version = assets.version, "Pinned asset snapshot");
        req.pin_assets(assets);
        Ok(Flow::Next)
    }
}
