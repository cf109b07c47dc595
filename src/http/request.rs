//! Request context and request-id generation.
//!
//! # Responsibilities
//! - Carry method, raw URL, headers and buffered body through the chain
//! - Derive `pathname` and `query` once, at the top of the chain
//! - Hold route `params` and the pinned asset snapshot
//! - Generate `x-request-id` values (UUID v4)
//!
//! # Design Decisions
//! - `pathname` is not percent-decoded; decoding happens per route param
//! - Query keys that repeat keep the last value

use axum::http::{HeaderMap, HeaderValue, Method, Request};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::assets::AssetCache;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Route parameters and query values, ordered for stable serialization.
pub type Params = BTreeMap<String, String>;

/// Per-request context handed to every handler in the chain.
#[derive(Debug, Clone)]
pub struct SsrRequest {
    pub method: Method,
    /// Raw request target as received (path plus query).
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// `url` without its query string. Set by [`SsrRequest::normalize`].
    pub pathname: String,
    pub params: Params,
    pub query: Params,
    assets: Option<Arc<AssetCache>>,
}

impl SsrRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            method,
            pathname: url.clone(),
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: Params::new(),
            query: Params::new(),
            assets: None,
        }
    }

    /// Build from an HTTP request whose body has already been buffered.
    pub fn from_http<B>(request: &Request<B>, body: Bytes) -> Self {
        let url = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let mut req = Self::new(request.method().clone(), url);
        req.headers = request.headers().clone();
        req.body = body;
        req
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Strip the query string from `url` into `pathname` and parse it into
    /// `query`.
    pub fn normalize(&mut self) {
        let (path, query) = match self.url.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (self.url.as_str(), None),
        };
        self.pathname = if path.is_empty() { "/".to_string() } else { path.to_string() };
        self.query = query
            .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
            .unwrap_or_default();
    }

    /// Pin the asset snapshot this request is served against.
    pub fn pin_assets(&mut self, assets: Arc<AssetCache>) {
        self.assets = Some(assets);
    }

    pub fn assets(&self) -> Option<&Arc<AssetCache>> {
        self.assets.as_ref()
    }

    pub fn request_id(&self) -> &str {
        self.headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }
}

/// Generates a UUID v4 for requests that arrive without `x-request-id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}
