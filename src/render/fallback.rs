//! 404 and 500 documents.
//!
//! Both pages go through the same template contract as regular pages. Every
//! value taken from the request or from an error is HTML-escaped before it
//! reaches a template.

use axum::http::StatusCode;
use html_escape::encode_text;

use crate::assets::AssetCache;
use crate::error::SsrError;
use crate::http::asset::HTML;
use crate::http::request::SsrRequest;
use crate::http::response::SsrResponse;
use crate::render::template::Templates;

pub const NOT_FOUND_TITLE: &str = "Not found";

/// Write the 404 page. `assets` is the snapshot the request was pinned to,
/// if any build has completed.
pub fn render_not_found(
    templates: &Templates,
    req: &SsrRequest,
    res: &mut SsrResponse,
    assets: Option<&AssetCache>,
) {
    let scripts = assets.map(AssetCache::main_script_tag).unwrap_or_default();
    let url = encode_text(&req.url);

    res.reset();
    res.set_status(StatusCode::NOT_FOUND);
    res.set_content_type(HTML);
    res.end(templates.not_found.render(&[
        ("title", NOT_FOUND_TITLE),
        ("method", req.method.as_str()),
        ("url", &url),
        ("scripts", &scripts),
    ]));
}

/// Replace whatever the failing stage produced with the 500 page.
pub fn render_error(templates: &Templates, req: &SsrRequest, res: &mut SsrResponse, err: &SsrError) {
    let url = encode_text(&req.url);
    let detail = err.detail();
    let error = encode_text(&detail);
    let stack = err.stack();
    let frames: Vec<&str> = stack.lines().skip(1).collect();
    let frames = frames.join("\n");
    let frames = encode_text(&frames);

    res.reset();
    res.set_status(StatusCode::INTERNAL_SERVER_ERROR);
    res.set_content_type(HTML);
    res.end(templates.error.render(&[
        ("title", err.name()),
        ("url", &url),
        ("error", &error),
        ("stack", &frames),
    ]));
}
