//! Shared fixtures for integration tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode};
use bytes::Bytes;
use serde::ser::{Error as _, Serialize, Serializer};
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tower::ServiceExt;

use ssr_gateway::assets::{AssetCache, AssetStore};
use ssr_gateway::config::SsrConfig;
use ssr_gateway::error::BoxError;
use ssr_gateway::http::{handler_fn, Flow, Gateway, SsrRequest, SsrServer};
use ssr_gateway::modules::{EndpointModule, ModuleTable, PageData, PageModule, RenderResult};
use ssr_gateway::render::Templates;
use ssr_gateway::routing::RouteTable;

pub const CHUNK_PATH: &str = "/client/app.abcd1234.js";
pub const CHUNK_BODY: &[u8] = b"console.log('app')";
pub const MAIN_SCRIPT_TAG: &str = "<script src='/client/main.js'></script>";

/// A value whose serialization always fails.
pub struct Unserializable;

impl Serialize for Unserializable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(S::Error::custom("cyclic structure"))
    }
}

pub fn assets() -> AssetCache {
    let mut assets = AssetCache::default();
    assets.client.main_file = "/client/main.js".into();
    assets
        .client
        .chunks
        .insert(CHUNK_PATH.into(), Bytes::from_static(CHUNK_BODY));
    assets
        .client
        .routes
        .insert("about".into(), "/client/about.js".into());
    assets.server.entry = "server.js".into();
    assets
}

pub fn routes() -> RouteTable {
    RouteTable::builder()
        .page("blog_new", "/blog/new")
        .page("blog_post", "/blog/[slug]")
        .page("about", "/about")
        .page("feed", "/feed")
        .page("broken", "/broken")
        .page("cyclic", "/cyclic")
        .endpoint("items", "/api/items")
        .build()
        .unwrap()
}

pub fn modules() -> ModuleTable {
    ModuleTable::new()
        .page(
            "blog_new",
            PageModule::new(|_: &PageData| Ok(RenderResult::new("<form>new post</form>"))),
        )
        .page(
            "blog_post",
            PageModule::new(|data: &PageData| {
                Ok(RenderResult::new(format!("<article>{}</article>", data.param("slug").unwrap_or(""))))
            }),
        )
        .page(
            "about",
            PageModule::new(|_: &PageData| Ok(RenderResult::new("<p>About</p>"))),
        )
        .page(
            "feed",
            PageModule::new(|data: &PageData| {
                let count = data.get("items").and_then(|v| v.as_array()).map_or(0, Vec::len);
                Ok(RenderResult::new(format!("<ul data-count='{}'></ul>", count))
                    .with_head("<title>Feed</title>")
                    .with_css("ul{margin:0}"))
            })
            .with_preload(|_: &SsrRequest| async {
                tokio::task::yield_now().await;
                Ok::<_, BoxError>(json!({ "items": ["a", "b"], "note": "</script>" }))
            }),
        )
        .page(
            "broken",
            PageModule::new(|_: &PageData| Err("<script>alert(1)</script>".into())),
        )
        .page(
            "cyclic",
            PageModule::new(|_: &PageData| Ok(RenderResult::new("<p>cyclic</p>")))
                .with_preload_sync(|_: &SsrRequest| Ok::<_, BoxError>(Unserializable)),
        )
        .endpoint(
            "items",
            EndpointModule::new()
                .get(handler_fn(|_req, res| {
                    res.set_content_type("application/json");
                    res.end("[]");
                    Ok(Flow::Handled)
                }))
                .del(handler_fn(|_req, res| {
                    res.set_status(StatusCode::NO_CONTENT);
                    Ok(Flow::Handled)
                })),
        )
}

pub fn gateway_with(store: Arc<AssetStore>, templates: Templates) -> Arc<Gateway> {
    Arc::new(Gateway::new(
        &SsrConfig::default(),
        store,
        Arc::new(routes()),
        Arc::new(modules()),
        Arc::new(templates),
    ))
}

pub fn server() -> SsrServer {
    let store = Arc::new(AssetStore::with_snapshot(assets()));
    SsrServer::new(&SsrConfig::default(), gateway_with(store, Templates::default()))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

/// Drive the router in-process.
pub async fn send(server: &SsrServer, method: Method, uri: &str) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = server.router().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    TestResponse {
        status,
        headers,
        body: String::from_utf8(body.to_vec()).unwrap(),
    }
}

pub async fn get(server: &SsrServer, uri: &str) -> TestResponse {
    send(server, Method::GET, uri).await
}

/// Minimal HTTP/1.1 client over a raw socket.
pub async fn raw_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    socket.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    socket.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}
