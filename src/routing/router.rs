//! Route table.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Look up the first route matching a pathname
//! - Return matched route with its params, or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan; registration order is priority, so specific patterns must
//!   be registered before catch-alls
//! - Duplicate route ids are rejected at build time

use std::collections::HashSet;
use thiserror::Error;

use crate::http::request::Params;
use crate::routing::matcher::{Matcher, PatternError, RoutePattern};

/// What kind of server module backs a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Page,
    Endpoint,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Page => "page",
            RouteKind::Endpoint => "endpoint",
        }
    }
}

/// A registered route.
#[derive(Debug)]
pub struct Route {
    id: String,
    kind: RouteKind,
    matcher: Box<dyn Matcher>,
}

impl Route {
    pub fn new(id: impl Into<String>, kind: RouteKind, matcher: impl Matcher + 'static) -> Self {
        Self {
            id: id.into(),
            kind,
            matcher: Box::new(matcher),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    pub fn test(&self, pathname: &str) -> bool {
        self.matcher.test(pathname)
    }

    pub fn exec(&self, pathname: &str) -> Params {
        self.matcher.exec(pathname).unwrap_or_default()
    }
}

/// Errors building a route table.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("route id '{0}' registered twice")]
    DuplicateId(String),
}

/// Ordered, immutable collection of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn builder() -> RouteTableBuilder {
        RouteTableBuilder::default()
    }

    /// First route (in registration order) whose matcher accepts the
    /// pathname, together with its extracted params.
    pub fn find(&self, pathname: &str) -> Option<(&Route, Params)> {
        self.routes
            .iter()
            .find(|route| route.test(pathname))
            .map(|route| (route, route.exec(pathname)))
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Builder preserving registration order.
#[derive(Debug, Default)]
pub struct RouteTableBuilder {
    routes: Vec<Route>,
    pending: Option<RouteError>,
}

impl RouteTableBuilder {
    /// Register a page route for a pattern like `/blog/[slug]`.
    pub fn page(self, id: &str, pattern: &str) -> Self {
        self.pattern(id, RouteKind::Page, pattern)
    }

    /// Register an endpoint route.
    pub fn endpoint(self, id: &str, pattern: &str) -> Self {
        self.pattern(id, RouteKind::Endpoint, pattern)
    }

    /// Register a route with a custom matcher.
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    fn pattern(mut self, id: &str, kind: RouteKind, pattern: &str) -> Self {
        match RoutePattern::parse(pattern) {
            Ok(matcher) => self.routes.push(Route::new(id, kind, matcher)),
            Err(e) => {
                self.pending.get_or_insert(RouteError::Pattern(e));
            }
        }
        self
    }

    pub fn build(self) -> Result<RouteTable, RouteError> {
        if let Some(err) = self.pending {
            return Err(err);
        }

        let mut seen = HashSet::new();
        for route in &self.routes {
            if !seen.insert(route.id.as_str()) {
                return Err(RouteError::DuplicateId(route.id.clone()));
            }
        }

        tracing::debug!(routes = self.routes.len(), "Route table built");
        Ok(RouteTable {
            routes: self.routes,
        })
    }
}
