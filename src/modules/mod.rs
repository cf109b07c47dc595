//! Server module registry.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     application registers PageModule / EndpointModule per route id
//!     → ModuleTable (immutable, shared via Arc)
//!
//! Request:
//!     matched Route.id → ModuleTable::resolve → Module::Page | Module::Endpoint
//! ```
//!
//! # Design Decisions
//! - Modules are resolved by id from a static table built once, not loaded
//!   per request
//! - A route whose module is missing, or of the wrong kind, is a 500

pub mod endpoint;
pub mod page;
pub mod preloaded;

use std::collections::HashMap;

use crate::error::SsrError;
use crate::routing::{Route, RouteKind, RouteTable};

pub use endpoint::{export_name, EndpointModule};
pub use page::{Css, PageData, PageModule, RenderResult};
pub use preloaded::Preloaded;

/// Server module behind a route.
#[derive(Debug, Clone)]
pub enum Module {
    Page(PageModule),
    Endpoint(EndpointModule),
}

impl Module {
    pub fn kind(&self) -> RouteKind {
        match self {
            Module::Page(_) => RouteKind::Page,
            Module::Endpoint(_) => RouteKind::Endpoint,
        }
    }
}

/// Route id → server module.
#[derive(Debug, Clone, Default)]
pub struct ModuleTable {
    modules: HashMap<String, Module>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, id: &str, module: PageModule) -> Self {
        self.modules.insert(id.to_string(), Module::Page(module));
        self
    }

    pub fn endpoint(mut self, id: &str, module: EndpointModule) -> Self {
        self.modules.insert(id.to_string(), Module::Endpoint(module));
        self
    }

    pub fn get(&self, id: &str) -> Option<&Module> {
        self.modules.get(id)
    }

    /// Module for a matched route, checked against the route's kind.
    pub fn resolve(&self, route: &Route) -> Result<&Module, SsrError> {
        match self.modules.get(route.id()) {
            Some(module) if module.kind() == route.kind() => Ok(module),
            _ => Err(SsrError::MissingModule(route.id().to_string())),
        }
    }

    /// Ids of routes with no module of the matching kind.
    pub fn unresolved<'a>(&self, routes: &'a RouteTable) -> Vec<&'a str> {
        routes
            .routes()
            .filter(|route| self.resolve(route).is_err())
            .map(Route::id)
            .collect()
    }
}
