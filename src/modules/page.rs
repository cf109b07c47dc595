//! Page modules.
//!
//! A page module is a `render` function plus an optional `preload` step.
//! `preload` may be async or synchronous and returns any `Serialize` value;
//! the value is converted to JSON once (see [`Preloaded`]), both to merge
//! into the render data and to inline for the client.

use futures_util::future::{self, BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

use crate::error::BoxError;
use crate::http::request::{Params, SsrRequest};
use crate::modules::preloaded::Preloaded;

/// Critical CSS produced by a render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Css {
    pub code: String,
}

/// Output of a page's `render`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderResult {
    pub html: String,
    pub head: String,
    pub css: Option<Css>,
}

impl RenderResult {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Self::default()
        }
    }

    pub fn with_head(mut self, head: impl Into<String>) -> Self {
        self.head = head.into();
        self
    }

    pub fn with_css(mut self, code: impl Into<String>) -> Self {
        self.css = Some(Css { code: code.into() });
        self
    }
}

/// Data handed to `render`: `params`, `query`, then every key of the
/// preloaded object, later keys overwriting earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageData(Map<String, Value>);

fn to_object(values: Params) -> Value {
    Value::Object(values.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
}

impl PageData {
    pub fn new(params: Params, query: Params) -> Self {
        let mut map = Map::new();
        map.insert("params".to_string(), to_object(params));
        map.insert("query".to_string(), to_object(query));
        Self(map)
    }

    /// Shallow merge: each key of `object` replaces the existing one.
    /// Anything other than a JSON object contributes no keys.
    pub fn merge(&mut self, preloaded: &Value) {
        if let Value::Object(object) = preloaded {
            self.merge_fields(object);
        }
    }

    pub fn merge_fields(&mut self, fields: &Map<String, Value>) {
        for (key, value) in fields {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.0.get("params")?.get(name)?.as_str()
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.0.get("query")?.get(name)?.as_str()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

pub type PreloadFn =
    Arc<dyn Fn(&SsrRequest) -> BoxFuture<'static, Result<Preloaded, BoxError>> + Send + Sync>;
pub type RenderFn = Arc<dyn Fn(&PageData) -> Result<RenderResult, BoxError> + Send + Sync>;

/// A page's server module.
#[derive(Clone)]
pub struct PageModule {
    preload: Option<PreloadFn>,
    render: RenderFn,
}

impl std::fmt::Debug for PageModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageModule")
            .field("preload", &self.preload.is_some())
            .finish_non_exhaustive()
    }
}

impl PageModule {
    pub fn new<F>(render: F) -> Self
    where
        F: Fn(&PageData) -> Result<RenderResult, BoxError> + Send + Sync + 'static,
    {
        Self {
            preload: None,
            render: Arc::new(render),
        }
    }

    /// Attach an async preload step.
    pub fn with_preload<F, Fut, T>(mut self, preload: F) -> Self
    where
        F: Fn(&SsrRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
        T: Serialize + Send + 'static,
    {
        self.preload = Some(Arc::new(
            move |req: &SsrRequest| -> BoxFuture<'static, Result<Preloaded, BoxError>> {
                preload(req)
                    .map(|result| result.map(|value| Preloaded::from_value(&value)))
                    .boxed()
            },
        ));
        self
    }

    /// Attach a preload step that completes synchronously.
    pub fn with_preload_sync<F, T>(self, preload: F) -> Self
    where
        F: Fn(&SsrRequest) -> Result<T, BoxError> + Send + Sync + 'static,
        T: Serialize + Send + 'static,
    {
        self.with_preload(move |req: &SsrRequest| future::ready(preload(req)))
    }

    pub fn preloader(&self) -> Option<&PreloadFn> {
        self.preload.as_ref()
    }

    pub fn renderer(&self) -> &RenderFn {
        &self.render
    }

    pub fn render(&self, data: &PageData) -> Result<RenderResult, BoxError> {
        (self.render)(data)
    }
}
