//! page-relay
//!
//! Serves one external website through this origin, rewriting its pages so
//! navigation, forms and sub-resources keep flowing back through the relay,
//! and presents the result as an installable web app.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                      PAGE RELAY                      │
//!                     │                                                      │
//!    Browser          │  ┌──────────┐    ┌────────────┐    ┌──────────────┐  │
//!    ─────────────────┼─▶│   http   │───▶│  handlers  │───▶│   upstream   │──┼──▶ Target
//!    /proxy?url=…     │  │  server  │    │  (routes)  │    │    client    │  │    site
//!    /resource?url=…  │  └──────────┘    └─────┬──────┘    └──────┬───────┘  │
//!                     │       │                │                  │          │
//!                     │       ▼                ▼                  │          │
//!    ◀────────────────┼── static PWA    ┌────────────┐            │          │
//!                     │   assets        │  rewrite   │◀───────────┘          │
//!                     │                 │ (lol_html) │  HTML + final URL     │
//!                     │                 └────────────┘                       │
//!                     │                                                      │
//!                     │  config · observability · lifecycle                  │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use page_relay::config::load_startup_config;
use page_relay::lifecycle::{wait_for_signal, Shutdown};
use page_relay::observability::{logging, metrics};
use page_relay::HttpServer;

#[derive(Parser)]
#[command(name = "page-relay")]
#[command(about = "HTML-rewriting forward proxy", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "RELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_startup_config(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    logging::install_panic_hook();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "page-relay starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        target_site = %config.proxy.target_site,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
