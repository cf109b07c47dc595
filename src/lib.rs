//! Server-side rendering gateway.
//!
//! Serves compiled client assets from an in-memory snapshot, dispatches page
//! and endpoint routes to registered server modules, streams page documents
//! and renders 404/500 fallbacks.

pub mod assets;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod modules;
pub mod observability;
pub mod render;
pub mod routing;

pub use assets::{AssetCache, AssetStore};
pub use config::SsrConfig;
pub use error::{BoxError, SsrError};
pub use http::{Gateway, SsrServer};
pub use lifecycle::Shutdown;
pub use modules::{EndpointModule, ModuleTable, PageModule, RenderResult};
pub use render::Templates;
pub use routing::RouteTable;
