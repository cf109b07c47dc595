//! Page document assembly.
//!
//! Builds the four page slots (`scripts`, `html`, `head`, `styles`) from a
//! render result, either as plain strings for a synchronous render or as
//! projections of one shared upstream future for a streamed one.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::AssetCache;
use crate::error::SsrError;
use crate::modules::{Css, RenderResult};
use crate::render::stream::{SlotError, SlotFuture};
use crate::render::template::Template;

/// Marks where the client runtime finds the server-rendered head.
pub const HEAD_START: &str = "<noscript id='ssr-head-start'></noscript>";
pub const HEAD_END: &str = "<noscript id='ssr-head-end'></noscript>";

/// Global the inline data script assigns to.
pub const DATA_GLOBAL: &str = "__SSR__";

/// A rendered page plus the inline-safe JSON of its preloaded data.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub result: RenderResult,
    pub preloaded: Option<String>,
}

/// The computation every streamed slot projects from.
pub type Upstream = Shared<BoxFuture<'static, Result<Arc<RenderedPage>, SlotError>>>;

/// `Link` header advertising the entry script and the route's bundle.
pub fn link_header(assets: &AssetCache, route_id: &str) -> String {
    let mut links = vec![format!(
        "<{}>;rel=\"preload\";as=\"script\"",
        assets.client.main_file
    )];
    if let Some(bundle) = assets.route_bundle(route_id) {
        links.push(format!("<{}>;rel=\"preload\";as=\"script\"", bundle));
    }
    links.join(", ")
}

/// JSON for embedding in a `<script>` element. `None` when the value
/// cannot be serialized.
pub fn serialize_preloaded(preloaded: &Value) -> Option<String> {
    match serde_json::to_string(preloaded) {
        Ok(json) => Some(
            json.replace('<', "\\u003c")
                .replace('\u{2028}', "\\u2028")
                .replace('\u{2029}', "\\u2029"),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Preloaded data is not serializable; omitting inline data");
            None
        }
    }
}

pub fn scripts_slot(main_script_tag: &str, preloaded: Option<&str>) -> String {
    match preloaded {
        Some(json) => format!(
            "<script>window.{} = {{preloaded: {}}};</script>{}",
            DATA_GLOBAL, json, main_script_tag
        ),
        None => main_script_tag.to_string(),
    }
}

pub fn head_slot(head: &str) -> String {
    format!("{}{}{}", HEAD_START, head, HEAD_END)
}

pub fn styles_slot(css: Option<&Css>) -> String {
    match css {
        Some(css) if !css.code.is_empty() => format!("<style>{}</style>", css.code),
        _ => String::new(),
    }
}

/// Render a complete page document in one pass.
pub fn render_document(template: &Template, assets: &AssetCache, page: &RenderedPage) -> String {
    let scripts = scripts_slot(&assets.main_script_tag(), page.preloaded.as_deref());
    let head = head_slot(&page.result.head);
    let styles = styles_slot(page.result.css.as_ref());
    template.render(&[
        ("scripts", &scripts),
        ("html", &page.result.html),
        ("head", &head),
        ("styles", &styles),
    ])
}

fn project(
    upstream: &Upstream,
    f: impl FnOnce(&RenderedPage) -> String + Send + 'static,
) -> SlotFuture {
    upstream
        .clone()
        .map(move |page| page.map(|page| f(&page)))
        .boxed()
}

/// One slot future per page slot, all derived from `upstream`.
pub fn page_slots(upstream: &Upstream, main_script_tag: String) -> HashMap<String, SlotFuture> {
    let mut slots = HashMap::with_capacity(4);
    slots.insert(
        "scripts".to_string(),
        project(upstream, move |page| {
            scripts_slot(&main_script_tag, page.preloaded.as_deref())
        }),
    );
    slots.insert(
        "html".to_string(),
        project(upstream, |page| page.result.html.clone()),
    );
    slots.insert(
        "head".to_string(),
        project(upstream, |page| head_slot(&page.result.head)),
    );
    slots.insert(
        "styles".to_string(),
        project(upstream, |page| styles_slot(page.result.css.as_ref())),
    );
    slots
}

/// Convert a shared failure back into an owned error once every other
/// handle on it is gone.
pub fn unshare(err: SlotError, route_id: &str) -> SsrError {
    Arc::try_unwrap(err).unwrap_or_else(|shared| SsrError::Render {
        route: route_id.to_string(),
        source: shared.to_string().into(),
    })
}
