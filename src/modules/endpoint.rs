//! Endpoint modules.
//!
//! An endpoint exports one handler per HTTP method, keyed by lower-cased
//! method name. `DELETE` is exported as `del`, the name existing route
//! modules use.

use axum::http::Method;
use std::collections::HashMap;
use std::sync::Arc;

use crate::http::chain::Handler;

/// Export name an endpoint uses for a request method.
pub fn export_name(method: &Method) -> String {
    if method == Method::DELETE {
        "del".to_string()
    } else {
        method.as_str().to_ascii_lowercase()
    }
}

/// An endpoint's server module.
#[derive(Clone, Default)]
pub struct EndpointModule {
    exports: HashMap<String, Arc<dyn Handler>>,
}

impl std::fmt::Debug for EndpointModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.exports.keys().collect();
        names.sort();
        f.debug_struct("EndpointModule").field("exports", &names).finish()
    }
}

impl EndpointModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export a handler under an explicit name.
    pub fn export(mut self, name: &str, handler: impl Handler + 'static) -> Self {
        self.exports.insert(name.to_string(), Arc::new(handler));
        self
    }

    pub fn get(self, handler: impl Handler + 'static) -> Self {
        self.export("get", handler)
    }

    pub fn post(self, handler: impl Handler + 'static) -> Self {
        self.export("post", handler)
    }

    pub fn put(self, handler: impl Handler + 'static) -> Self {
        self.export("put", handler)
    }

    pub fn patch(self, handler: impl Handler + 'static) -> Self {
        self.export("patch", handler)
    }

    pub fn del(self, handler: impl Handler + 'static) -> Self {
        self.export("del", handler)
    }

    pub fn head(self, handler: impl Handler + 'static) -> Self {
        self.export("head", handler)
    }

    pub fn options(self, handler: impl Handler + 'static) -> Self {
        self.export("options", handler)
    }

    /// Handler exported for a request method, if any.
    pub fn handler_for(&self, method: &Method) -> Option<&Arc<dyn Handler>> {
        self.exports.get(&export_name(method))
    }
}
