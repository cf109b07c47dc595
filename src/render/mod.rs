//! Document rendering.
//!
//! # Data Flow
//! ```text
//! Page without preload:
//!     RenderResult → document::render_document → one complete body
//!
//! Page with preload:
//!     shared upstream (preload → merge → render)
//!         → document::page_slots (scripts, html, head, styles)
//!         → Template::stream → stream::Sequencer → ordered body chunks
//!
//! Fallbacks:
//!     no match      → fallback::render_not_found (404)
//!     dispatch error → fallback::render_error (500)
//! ```
//!
//! # Design Decisions
//! - Sync and streamed renders share the slot builders, so a page without
//!   preload produces the same bytes either way
//! - Slot order is the template's textual order, never completion order

pub mod document;
pub mod fallback;
pub mod stream;
pub mod template;

pub use document::{link_header, render_document, RenderedPage, Upstream};
pub use fallback::{render_error, render_not_found};
pub use stream::{Sequencer, SlotError, SlotFuture};
pub use template::{Template, Templates};
