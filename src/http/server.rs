//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the handler chain (normalize, pin assets, assets, routes)
//! - Run every request through the chain, with the 404 page as fallback
//! - Create the axum Router and wire middleware (tracing, request ID,
//!   optional timeout)
//! - Buffer request bodies up to the configured limit
//! - Bind to a listener and shut down gracefully

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::assets::AssetStore;
use crate::config::SsrConfig;
use crate::http::asset::AssetHandler;
use crate::http::chain::{Chain, Flow, Handler};
use crate::http::request::{SsrRequest, UuidRequestId, X_REQUEST_ID};
use crate::http::response::SsrResponse;
use crate::http::stages::{Normalize, PinAssets};
use crate::modules::ModuleTable;
use crate::observability::metrics::{self, Outcome};
use crate::render::{render_error, render_not_found, Templates};
use crate::routing::{RouteHandler, RouteTable};

/// The request pipeline, independent of any transport.
pub struct Gateway {
    chain: Chain,
    templates: Arc<Templates>,
}

impl Gateway {
    pub fn new(
        config: &SsrConfig,
        store: Arc<AssetStore>,
        routes: Arc<RouteTable>,
        modules: Arc<ModuleTable>,
        templates: Arc<Templates>,
    ) -> Self {
        for id in modules.unresolved(&routes) {
            tracing::warn!(route = id, "Route has no matching server module; requests to it will fail");
        }

        let mut chain = Chain::default()
            .with(Normalize)
            .with(PinAssets::new(store.clone()));
        for stage in AssetHandler::standard(&store, &config.cache) {
            chain = chain.with(stage);
        }
        let chain = chain.with(RouteHandler::new(routes, modules, templates.clone(), store));

        Self { chain, templates }
    }

    /// Handle one request to completion.
    pub async fn handle(&self, mut req: SsrRequest) -> SsrResponse {
        let start = Instant::now();
        let mut res = SsrResponse::new();

        let outcome = match self.chain.handle(&mut req, &mut res).await {
            Ok(Flow::Handled) => classify(&res),
            Ok(Flow::Next) => {
                tracing::debug!(method = %req.method, url = %req.url, "Not found");
                let assets = req.assets().cloned();
                render_not_found(&self.templates, &req, &mut res, assets.as_deref());
                Outcome::NotFound
            }
            Err(err) => {
                tracing::error!(
                    request_id = %req.request_id(),
                    url = %req.url,
                    error = %err,
                    "Request failed outside dispatch"
                );
                render_error(&self.templates, &req, &mut res, &err);
                Outcome::Error
            }
        };

        metrics::record_request(req.method.as_str(), res.status().as_u16(), outcome, start);
        res
    }
}

/// Outcome label for a response some stage completed. Asset stages are the
/// only ones setting `Cache-Control`, pages the only ones setting `Link`.
fn classify(res: &SsrResponse) -> Outcome {
    if res.status().is_server_error() {
        Outcome::Error
    } else if res.headers().contains_key(header::CACHE_CONTROL) {
        Outcome::Asset
    } else if res.headers().contains_key(header::LINK) {
        Outcome::Page
    } else {
        Outcome::Endpoint
    }
}

#[derive(Clone)]
struct AppState {
    gateway: Arc<Gateway>,
    max_body_bytes: usize,
}

/// HTTP server for the SSR gateway.
pub struct SsrServer {
    router: Router,
}

impl SsrServer {
    pub fn new(config: &SsrConfig, gateway: Arc<Gateway>) -> Self {
        let state = AppState {
            gateway,
            max_body_bytes: config.limits.max_body_bytes,
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &SsrConfig, state: AppState) -> Router {
        let mut router = Router::new().fallback(serve).with_state(state);

        if config.timeouts.request_secs > 0 {
            router = router.layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));
        }

        router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The configured router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Fallback handler: every request goes through the gateway.
async fn serve(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                uri = %parts.uri,
                limit = state.max_body_bytes,
                error = %e,
                "Failed to read request body"
            );
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let req = SsrRequest::from_http(&Request::from_parts(parts, ()), body);
    state.gateway.handle(req).await.into_response()
}
