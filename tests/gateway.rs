//! End-to-end behaviour of the gateway through the axum router.

use axum::http::{header, Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use ssr_gateway::assets::AssetStore;
use ssr_gateway::config::SsrConfig;
use ssr_gateway::http::SsrServer;
use ssr_gateway::lifecycle::Shutdown;
use ssr_gateway::render::{Template, Templates};

mod common;

use common::{get, send, CHUNK_BODY, CHUNK_PATH, MAIN_SCRIPT_TAG};

#[tokio::test]
async fn unmatched_path_is_404_with_method_and_url() {
    let server = common::server();

    let res = send(&server, Method::POST, "/no/such/page?ref=home").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.headers[header::CONTENT_TYPE], "text/html");
    assert!(res.body.contains("Not found"));
    assert!(res.body.contains("POST"));
    assert!(res.body.contains("/no/such/page?ref=home"));
    assert!(res.body.contains(MAIN_SCRIPT_TAG));
}

#[tokio::test]
async fn cached_chunk_is_served_with_immutable_policy() {
    let server = common::server();

    let res = get(&server, CHUNK_PATH).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers[header::CONTENT_TYPE], "application/javascript");
    assert_eq!(res.headers[header::CACHE_CONTROL], "max-age=31536000");
    assert_eq!(res.body.as_bytes(), CHUNK_BODY);
}

#[tokio::test]
async fn unknown_chunk_falls_through_to_404() {
    let server = common::server();
    let res = get(&server, "/client/missing.js").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn page_without_preload_has_no_inline_data() {
    let server = common::server();

    let res = get(&server, "/about").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers[header::CONTENT_TYPE], "text/html");
    assert_eq!(
        res.headers[header::LINK],
        "</client/main.js>;rel=\"preload\";as=\"script\", </client/about.js>;rel=\"preload\";as=\"script\""
    );
    assert!(res.body.contains("<p>About</p>"));
    assert!(res.body.contains(MAIN_SCRIPT_TAG));
    assert!(!res.body.contains("__SSR__"));
}

#[tokio::test]
async fn preloaded_page_streams_merged_and_inlined_data() {
    let server = common::server();

    let res = get(&server, "/feed").await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("<ul data-count='2'></ul>"));
    assert!(res.body.contains("<style>ul{margin:0}</style>"));
    assert!(res.body.contains(
        "<noscript id='ssr-head-start'></noscript><title>Feed</title><noscript id='ssr-head-end'></noscript>"
    ));
    assert!(res.body.contains("window.__SSR__ = {preloaded: "));
    assert!(res.body.contains("\\u003c/script>"));

    let inline = res.body.find("window.__SSR__").unwrap();
    let entry = res.body.find(MAIN_SCRIPT_TAG).unwrap();
    assert!(inline < entry);
}

#[tokio::test]
async fn slots_follow_template_order() {
    let mut templates = Templates::default();
    templates.main = Template::parse("%ssr.scripts%|%ssr.html%|%ssr.head%|%ssr.styles%");
    let store = Arc::new(AssetStore::with_snapshot(common::assets()));
    let server = SsrServer::new(&SsrConfig::default(), common::gateway_with(store, templates));

    let res = get(&server, "/feed").await;
    let scripts = res.body.find(MAIN_SCRIPT_TAG).unwrap();
    let html = res.body.find("<ul").unwrap();
    let head = res.body.find("<title>Feed</title>").unwrap();
    let styles = res.body.find("<style>").unwrap();
    assert!(scripts < html && html < head && head < styles);
}

#[tokio::test]
async fn serialization_failure_falls_back_to_entry_script() {
    let server = common::server();

    let res = get(&server, "/cyclic").await;
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("<p>cyclic</p>"));
    assert!(res.body.contains(MAIN_SCRIPT_TAG));
    assert!(!res.body.contains("__SSR__"));
}

#[tokio::test]
async fn delete_dispatches_to_del_export() {
    let server = common::server();

    let res = send(&server, Method::DELETE, "/api/items").await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = get(&server, "/api/items").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers[header::CONTENT_TYPE], "application/json");
    assert_eq!(res.body, "[]");
}

#[tokio::test]
async fn missing_method_export_is_404_not_405() {
    let server = common::server();
    let res = send(&server, Method::PUT, "/api/items").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert!(res.body.contains("PUT"));
}

#[tokio::test]
async fn earlier_registered_route_wins() {
    let server = common::server();

    let res = get(&server, "/blog/new").await;
    assert!(res.body.contains("<form>new post</form>"));

    let res = get(&server, "/blog/hello").await;
    assert!(res.body.contains("<article>hello</article>"));
}

#[tokio::test]
async fn render_error_is_500_with_escaped_message() {
    let server = common::server();

    let res = get(&server, "/broken").await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.headers[header::CONTENT_TYPE], "text/html");
    assert!(res.headers.get(header::LINK).is_none());
    assert!(res.body.contains("RenderError"));
    assert!(res.body.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!res.body.contains("<script>alert(1)"));
}

#[tokio::test]
async fn request_id_is_generated_and_echoed() {
    let server = common::server();

    let res = get(&server, "/about").await;
    let id = res.headers["x-request-id"].to_str().unwrap();
    assert_eq!(id.len(), 36);

    let request = axum::http::Request::builder()
        .uri("/about")
        .header("x-request-id", "req-123")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(server.router(), request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn requests_wait_for_first_build() {
    let store = Arc::new(AssetStore::new());
    let server = SsrServer::new(
        &SsrConfig::default(),
        common::gateway_with(store.clone(), Templates::default()),
    );

    let pending = tokio::spawn(async move { get(&server, "/about").await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!pending.is_finished());

    store.install(common::assets());
    let res = pending.await.unwrap();
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.body.contains("<p>About</p>"));
}

#[tokio::test]
async fn server_serves_until_shutdown() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let task = tokio::spawn(common::server().run(listener, shutdown.subscribe()));

    let response = common::raw_get(addr, "/about").await;
    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.contains("<p>About</p>"));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
