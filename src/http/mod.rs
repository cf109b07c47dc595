//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, body buffering)
//!     → request.rs (SsrRequest: method, url, headers, body)
//!     → chain.rs (ordered handlers, first `Handled` wins)
//!         → stages.rs (normalize pathname/query, pin asset snapshot)
//!         → asset.rs (index, service worker, client chunks)
//!         → routing::RouteHandler (pages and endpoints)
//!     → server.rs (404 page when the chain falls through)
//!     → response.rs (SsrResponse → axum Response, full or streamed)
//! ```

pub mod asset;
pub mod chain;
pub mod request;
pub mod response;
pub mod server;
pub mod stages;

pub use chain::{handler_fn, Chain, Flow, Handler};
pub use request::{Params, SsrRequest, X_REQUEST_ID};
pub use response::SsrResponse;
pub use server::{Gateway, SsrServer};
