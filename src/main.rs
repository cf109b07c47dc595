//! SSR gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                    SSR GATEWAY                   │
//!   Client Request    │  ┌────────┐   ┌───────────┐   ┌──────────────┐   │
//!   ──────────────────┼─▶│ server │──▶│   chain   │──▶│ asset stages │   │
//!                     │  └────────┘   │ normalize │   └──────┬───────┘   │
//!                     │               │ pin assets│          ▼           │
//!                     │               └───────────┘   ┌──────────────┐   │
//!                     │                               │   routing    │   │
//!                     │                               │  dispatch    │   │
//!                     │                               └──────┬───────┘   │
//!   Client Response   │  ┌──────────┐                        ▼           │
//!   ◀─────────────────┼──│ response │◀──── render (document / 404 / 500) │
//!                     │  └──────────┘                                    │
//!                     │                                                  │
//!                     │  assets: manifest loader (prod) / watcher (dev)  │
//!                     │  config · observability · lifecycle              │
//!                     └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use ssr_gateway::assets::{load_manifest, AssetStore, ManifestWatcher};
use ssr_gateway::config::{load_config, SsrConfig};
use ssr_gateway::http::{handler_fn, Flow, Gateway, SsrServer};
use ssr_gateway::lifecycle::{wait_for_signal, Shutdown};
use ssr_gateway::modules::{EndpointModule, ModuleTable, PageData, PageModule, RenderResult};
use ssr_gateway::observability::{init_logging, metrics};
use ssr_gateway::render::Templates;
use ssr_gateway::routing::RouteTable;

#[derive(Parser, Debug)]
#[command(name = "ssr-gateway", version, about = "Server-side rendering gateway")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Watch the build output and wait for the first build before serving.
    #[arg(long)]
    dev: bool,

    /// Build output directory (overrides the config file).
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

/// Routes served by the stock binary.
fn routes() -> Result<(RouteTable, ModuleTable), Box<dyn std::error::Error>> {
    let routes = RouteTable::builder()
        .endpoint("health", "/api/health")
        .page("hello", "/hello/[name]")
        .build()?;

    let modules = ModuleTable::new()
        .endpoint(
            "health",
            EndpointModule::new().get(handler_fn(|req, res| {
                let version = req.assets().map(|a| a.version).unwrap_or(0);
                res.set_content_type("application/json");
                res.end(json!({ "status": "ok", "assets": version }).to_string());
                Ok(Flow::Handled)
            })),
        )
        .page(
            "hello",
            PageModule::new(|data: &PageData| {
                let name = html_escape::encode_text(data.param("name").unwrap_or("world")).into_owned();
                Ok(RenderResult::new(format!("<h1>Hello, {}</h1>", name))
                    .with_head(format!("<title>Hello, {}</title>", name)))
            }),
        );

    Ok((routes, modules))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => SsrConfig::default(),
    };
    if cli.dev {
        config.dev = true;
    }
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }

    init_logging(&config.observability);
    tracing::info!("ssr-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        output_dir = %config.output_dir.display(),
        dev = config.dev,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let templates = Arc::new(Templates::load(config.templates.dir.as_deref())?);

    // The watcher must outlive the server for events to keep flowing.
    let (store, _watcher) = if config.dev {
        let store = Arc::new(AssetStore::new());
        let watcher = ManifestWatcher::new(&config.output_dir, store.clone());
        if !watcher.initial_build() {
            tracing::info!("No build output yet; waiting for the first build");
        }
        (store, Some(watcher.run()?))
    } else {
        let cache = load_manifest(&config.output_dir)?;
        tracing::info!(entry = %cache.server.entry, chunks = cache.client.chunks.len(), "Build output loaded");
        (Arc::new(AssetStore::with_snapshot(cache)), None)
    };

    let (routes, modules) = routes()?;
    let gateway = Gateway::new(
        &config,
        store,
        Arc::new(routes),
        Arc::new(modules),
        templates,
    );
    let server = SsrServer::new(&config, Arc::new(gateway));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(server.run(listener, server_shutdown));

    wait_for_signal().await;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
