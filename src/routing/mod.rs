//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     (id, kind, pattern)[] in registration order
//!     → matcher.rs (compile each pattern into segments)
//!     → router.rs (freeze as immutable RouteTable)
//!
//! Request:
//!     pathname
//!     → RouteTable::find (first match wins)
//!     → dispatch.rs (page pipeline or endpoint method dispatch)
//!     → no match: fall through to the 404 page
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod dispatch;
pub mod matcher;
pub mod router;

pub use dispatch::RouteHandler;
pub use matcher::{Matcher, PatternError, RoutePattern};
pub use router::{Route, RouteError, RouteKind, RouteTable, RouteTableBuilder};
