//! Route dispatch.
//!
//! # Responsibilities
//! - Match the pathname against the route table
//! - Run the page pipeline (preload → merge → render → document)
//! - Method-dispatch endpoint routes to their exports
//! - Catch every dispatch failure once and turn it into the 500 page,
//!   panics in page or endpoint code included
//!
//! # Design Decisions
//! - `Content-Type: text/html` is set before anything else; endpoints may
//!   override it
//! - Route matching starts only after one scheduler yield
//! - Pages with preload are streamed, but the dispatcher waits for the
//!   shared upstream before committing the stream, so a failure never
//!   leaves a half-written document behind
//! - Missing endpoint export falls through to the 404 page, not 405

use async_trait::async_trait;
use axum::http::header;
use futures_util::future::{BoxFuture, FutureExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::assets::{AssetCache, AssetStore};
use crate::error::{BoxError, SsrError};
use crate::http::asset::HTML;
use crate::http::chain::{Flow, Handler};
use crate::http::request::SsrRequest;
use crate::http::response::SsrResponse;
use crate::modules::page::{PageData, RenderFn};
use crate::modules::{EndpointModule, Module, ModuleTable, PageModule, Preloaded};
use crate::render::document::{
    link_header, page_slots, render_document, serialize_preloaded, unshare, RenderedPage, Upstream,
};
use crate::render::fallback::render_error;
use crate::render::Templates;
use crate::routing::router::RouteTable;

/// Final chain stage: serves pages and endpoints from the route table.
pub struct RouteHandler {
    routes: Arc<RouteTable>,
    modules: Arc<ModuleTable>,
    templates: Arc<Templates>,
    store: Arc<AssetStore>,
}

impl RouteHandler {
    pub fn new(
        routes: Arc<RouteTable>,
        modules: Arc<ModuleTable>,
        templates: Arc<Templates>,
        store: Arc<AssetStore>,
    ) -> Self {
        Self {
            routes,
            modules,
            templates,
            store,
        }
    }

    async fn dispatch(&self, req: &mut SsrRequest, res: &mut SsrResponse) -> Result<Flow, SsrError> {
        let Some((route, params)) = self.routes.find(&req.pathname) else {
            tracing::debug!(pathname = %req.pathname, "No route matched");
            return Ok(Flow::Next);
        };
        tracing::debug!(route = route.id(), kind = route.kind().as_str(), "Route matched");
        req.params = params;

        match self.modules.resolve(route)? {
            Module::Page(page) => {
                let assets = match req.assets() {
                    Some(assets) => assets.clone(),
                    None => self.store.ready().await,
                };
                self.page(route.id(), page, &assets, req, res).await
            }
            Module::Endpoint(endpoint) => endpoint_call(route.id(), endpoint, req, res).await,
        }
    }

    /// Renders a page. With preload, the upstream is awaited before the
    /// stream is attached, so only slot order is observable, not timing.
    async fn page(
        &self,
        route_id: &str,
        page: &PageModule,
        assets: &AssetCache,
        req: &SsrRequest,
        res: &mut SsrResponse,
    ) -> Result<Flow, SsrError> {
        res.set_header(header::LINK, &link_header(assets, route_id));
        let data = PageData::new(req.params.clone(), req.query.clone());

        let Some(preload) = page.preloader() else {
            let result = page.render(&data).map_err(|source| SsrError::Render {
                route: route_id.to_string(),
                source,
            })?;
            let page = RenderedPage {
                result,
                preloaded: None,
            };
            res.end(render_document(&self.templates.main, assets, &page));
            return Ok(Flow::Handled);
        };

        let pending = preload(req);
        let upstream: Upstream = render_page(
            route_id.to_string(),
            pending,
            page.renderer().clone(),
            data,
        )
        .map(|page| page.map_err(Arc::new))
        .boxed()
        .shared();

        if let Err(err) = upstream.clone().await {
            drop(upstream);
            return Err(unshare(err, route_id));
        }

        res.stream(self.templates.main.stream(page_slots(&upstream, assets.main_script_tag())));
        Ok(Flow::Handled)
    }
}

/// The shared upstream of a streamed page.
async fn render_page(
    route_id: String,
    pending: BoxFuture<'static, Result<Preloaded, BoxError>>,
    render: RenderFn,
    mut data: PageData,
) -> Result<Arc<RenderedPage>, SsrError> {
    let preloaded = pending.await.map_err(|source| SsrError::Preload {
        route: route_id.clone(),
        source,
    })?;

    if let Some(fields) = preloaded.fields() {
        data.merge_fields(fields);
    }
    let inline = match &preloaded {
        Preloaded::Complete(value) => serialize_preloaded(value),
        Preloaded::Partial { error, .. } => {
            tracing::warn!(route = %route_id, error = %error, "Preloaded data is not serializable; omitting inline data");
            None
        }
    };

    let result = render(&data).map_err(|source| SsrError::Render {
        route: route_id,
        source,
    })?;
    Ok(Arc::new(RenderedPage {
        result,
        preloaded: inline,
    }))
}

async fn endpoint_call(
    route_id: &str,
    endpoint: &EndpointModule,
    req: &mut SsrRequest,
    res: &mut SsrResponse,
) -> Result<Flow, SsrError> {
    let Some(handler) = endpoint.handler_for(&req.method) else {
        tracing::debug!(route = route_id, method = %req.method, "Endpoint has no export for method");
        return Ok(Flow::Next);
    };

    handler.handle(req, res).await.map_err(|err| match err {
        err @ SsrError::Endpoint { .. } => err,
        other => SsrError::Endpoint {
            route: route_id.to_string(),
            method: req.method.to_string(),
            source: Box::new(other),
        },
    })
}

#[async_trait]
impl Handler for RouteHandler {
    async fn handle(&self, req: &mut SsrRequest, res: &mut SsrResponse) -> Result<Flow, SsrError> {
        res.set_content_type(HTML);
        tokio::task::yield_now().await;

        let outcome = AssertUnwindSafe(self.dispatch(req, res))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(SsrError::from_panic(payload)));

        match outcome {
            Ok(flow) => Ok(flow),
            Err(err) => {
                tracing::error!(
                    request_id = %req.request_id(),
                    url = %req.url,
                    error = %err,
                    "Dispatch failed"
                );
                render_error(&self.templates, req, res, &err);
                Ok(Flow::Handled)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::chain::handler_fn;
    use crate::modules::RenderResult;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    fn assets() -> AssetCache {
        let mut assets = AssetCache::default();
        assets.client.main_file = "/client/main.js".into();
        assets
            .client
            .routes
            .insert("blog".into(), "/client/blog.js".into());
        assets
    }

    fn handler(routes: RouteTable, modules: ModuleTable) -> RouteHandler {
        RouteHandler::new(
            Arc::new(routes),
            Arc::new(modules),
            Arc::new(Templates::default()),
            Arc::new(AssetStore::with_snapshot(assets())),
        )
    }

    async fn run(handler: &RouteHandler, method: Method, url: &str) -> (Flow, SsrResponse) {
        let mut req = SsrRequest::new(method, url);
        req.normalize();
        req.pin_assets(Arc::new(assets()));
        let mut res = SsrResponse::new();
        let flow = handler.handle(&mut req, &mut res).await.unwrap();
        (flow, res)
    }

    async fn text(res: SsrResponse) -> String {
        String::from_utf8(res.into_bytes().await.unwrap().to_vec()).unwrap()
    }

    fn blog_routes() -> RouteTable {
        RouteTable::builder().page("blog", "/blog/[slug]").build().unwrap()
    }

    #[tokio::test]
    async fn unmatched_falls_through_with_html_type() {
        let handler = handler(RouteTable::default(), ModuleTable::new());
        let (flow, res) = run(&handler, Method::GET, "/nothing").await;
        assert_eq!(flow, Flow::Next);
        assert_eq!(res.header(header::CONTENT_TYPE), Some(HTML));
        assert!(!res.is_ended());
    }

    #[tokio::test]
    async fn page_without_preload_renders_synchronously() {
        let modules = ModuleTable::new().page(
            "blog",
            PageModule::new(|data: &PageData| {
                Ok(RenderResult::new(format!("<h1>{}</h1>", data.param("slug").unwrap_or("?"))))
            }),
        );
        let handler = handler(blog_routes(), modules);

        let (flow, res) = run(&handler, Method::GET, "/blog/hello%20world").await;
        assert_eq!(flow, Flow::Handled);
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(
            res.header(header::LINK),
            Some("</client/main.js>;rel=\"preload\";as=\"script\", </client/blog.js>;rel=\"preload\";as=\"script\"")
        );
        let body = text(res).await;
        assert!(body.contains("<h1>hello world</h1>"));
        assert!(!body.contains("__SSR__"));
    }

    #[tokio::test]
    async fn preloaded_data_is_merged_and_inlined() {
        let modules = ModuleTable::new().page(
            "blog",
            PageModule::new(|data: &PageData| {
                let title = data.get("title").and_then(|v| v.as_str()).unwrap_or("");
                Ok(RenderResult::new(format!("<h1>{}</h1>", title)))
            })
            .with_preload(|req: &SsrRequest| {
                let slug = req.params.get("slug").cloned().unwrap_or_default();
                async move { Ok::<_, BoxError>(json!({ "title": slug })) }
            }),
        );
        let handler = handler(blog_routes(), modules);

        let (_, res) = run(&handler, Method::GET, "/blog/first").await;
        let body = text(res).await;
        assert!(body.contains("<h1>first</h1>"));
        assert!(body.contains("window.__SSR__ = {preloaded: {\"title\":\"first\"}};"));
    }

    #[tokio::test]
    async fn preload_failure_renders_error_page() {
        let modules = ModuleTable::new().page(
            "blog",
            PageModule::new(|_: &PageData| Ok(RenderResult::new("never")))
                .with_preload_sync(|_: &SsrRequest| Err::<(), BoxError>("backend down".into())),
        );
        let handler = handler(blog_routes(), modules);

        let (flow, res) = run(&handler, Method::GET, "/blog/x").await;
        assert_eq!(flow, Flow::Handled);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(res.header(header::LINK).is_none());
        let body = text(res).await;
        assert!(body.contains("PreloadError"));
        assert!(body.contains("backend down"));
        assert!(!body.contains("never"));
    }

    #[tokio::test]
    async fn async_preload_failure_renders_error_page() {
        let modules = ModuleTable::new().page(
            "blog",
            PageModule::new(|_: &PageData| Ok(RenderResult::new("never"))).with_preload(|_: &SsrRequest| async {
                tokio::task::yield_now().await;
                Err::<(), BoxError>("upstream timed out".into())
            }),
        );
        let handler = handler(blog_routes(), modules);

        let (flow, res) = run(&handler, Method::GET, "/blog/x").await;
        assert_eq!(flow, Flow::Handled);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = text(res).await;
        assert!(body.contains("PreloadError"));
        assert!(body.contains("upstream timed out"));
        assert!(!body.contains("never"));
    }

    #[derive(serde::Serialize)]
    struct Board {
        title: &'static str,
        grid: std::collections::HashMap<(u8, u8), u8>,
    }

    #[tokio::test]
    async fn unserializable_preload_still_reaches_render() {
        let modules = ModuleTable::new().page(
            "blog",
            PageModule::new(|data: &PageData| {
                let title = data.get("title").and_then(|v| v.as_str()).unwrap_or("missing");
                Ok(RenderResult::new(format!("<h1>{}</h1>", title)))
            })
            .with_preload_sync(|_: &SsrRequest| {
                Ok::<_, BoxError>(Board {
                    title: "Hello",
                    grid: [((0, 0), 1)].into_iter().collect(),
                })
            }),
        );
        let handler = handler(blog_routes(), modules);

        let (flow, res) = run(&handler, Method::GET, "/blog/x").await;
        assert_eq!(flow, Flow::Handled);
        assert_eq!(res.status(), StatusCode::OK);
        let body = text(res).await;
        assert!(body.contains("<h1>Hello</h1>"));
        assert!(!body.contains("__SSR__"));
        assert!(body.contains("/client/main.js"));
    }

    #[tokio::test]
    async fn render_panic_renders_error_page() {
        let modules = ModuleTable::new().page(
            "blog",
            PageModule::new(|_: &PageData| -> Result<RenderResult, BoxError> { panic!("template exploded") })
                .with_preload_sync(|_: &SsrRequest| Ok::<_, BoxError>(json!({"title": "x"}))),
        );
        let handler = handler(blog_routes(), modules);

        let (flow, res) = run(&handler, Method::GET, "/blog/x").await;
        assert_eq!(flow, Flow::Handled);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = text(res).await;
        assert!(body.contains("PanicError"));
        assert!(body.contains("template exploded"));
    }

    #[tokio::test]
    async fn endpoint_panic_renders_error_page() {
        let routes = RouteTable::builder().endpoint("items", "/api/items").build().unwrap();
        let modules = ModuleTable::new().endpoint(
            "items",
            EndpointModule::new().get(handler_fn(|_req, _res| -> Result<Flow, SsrError> { panic!("handler bug") })),
        );
        let handler = handler(routes, modules);

        let (flow, res) = run(&handler, Method::GET, "/api/items").await;
        assert_eq!(flow, Flow::Handled);
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(text(res).await.contains("PanicError"));
    }

    #[tokio::test]
    async fn missing_module_is_a_server_error() {
        let handler = handler(blog_routes(), ModuleTable::new());
        let (_, res) = run(&handler, Method::GET, "/blog/x").await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(text(res).await.contains("MissingModuleError"));
    }

    #[tokio::test]
    async fn endpoint_methods_dispatch_by_export_name() {
        let routes = RouteTable::builder().endpoint("items", "/api/items").build().unwrap();
        let modules = ModuleTable::new().endpoint(
            "items",
            EndpointModule::new().del(handler_fn(|_req, res| {
                res.set_content_type("application/json");
                res.end("{\"deleted\":true}");
                Ok(Flow::Handled)
            })),
        );
        let handler = handler(routes, modules);

        let (flow, res) = run(&handler, Method::DELETE, "/api/items").await;
        assert_eq!(flow, Flow::Handled);
        assert_eq!(res.header(header::CONTENT_TYPE), Some("application/json"));
        assert_eq!(text(res).await, "{\"deleted\":true}");

        let (flow, _) = run(&handler, Method::PUT, "/api/items").await;
        assert_eq!(flow, Flow::Next);
    }

    #[tokio::test]
    async fn endpoint_errors_are_wrapped() {
        let routes = RouteTable::builder().endpoint("items", "/api/items").build().unwrap();
        let modules = ModuleTable::new().endpoint(
            "items",
            EndpointModule::new().post(handler_fn(|_req, _res| Err(SsrError::Body("bad json".into())))),
        );
        let handler = handler(routes, modules);

        let (_, res) = run(&handler, Method::POST, "/api/items").await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = text(res).await;
        assert!(body.contains("EndpointError"));
        assert!(body.contains("bad json"));
    }
}
