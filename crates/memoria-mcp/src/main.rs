//! memoria-mcp — an MCP server exposing a persistent memory engine for AI
//! agents over stdio (and, with the `http` feature, HTTP/WebSocket).
//!
//! Exposes six tools: `remember`, `recall`, `pin`, `unpin`, `forget`, and
//! `feedback`. A background task periodically runs the forgetting sweep and
//! the spaced-repetition review pass so memory upkeep doesn't depend on a
//! client calling anything.

mod context;
mod protocol;
mod server;
mod sweep;
mod tools;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use memoria_core::Config;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use crate::context::AppContext;
use crate::protocol::stdio::StdioTransport;
use crate::server::McpServer;

#[derive(Parser, Debug)]
#[command(name = "memoria-mcp", version, about = "Persistent memory engine for AI agents, over MCP")]
struct Cli {
    /// Run the HTTP/WebSocket transport instead of stdio.
    #[cfg(feature = "http")]
    #[arg(long)]
    http: bool,

    /// Port for the HTTP transport (only with --http).
    #[cfg(feature = "http")]
    #[arg(long, default_value_t = 3100)]
    port: u16,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();
}

/// Interval between background sweeps, overridable for tests/tight loops.
const SWEEP_INTERVAL_SECS: u64 = 3600;

fn spawn_background_sweeps(ctx: Arc<AppContext>) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        loop {
            sweep::run_forgetting_sweep(&ctx).await;
            sweep::run_review_pass(&ctx).await;
            tokio::time::sleep(Duration::from_secs(SWEEP_INTERVAL_SECS)).await;
        }
    });
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging();

    info!("memoria-mcp v{} starting", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();
    let ctx = match AppContext::new(config) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            error!("failed to initialize application context: {e}");
            std::process::exit(1);
        }
    };

    spawn_background_sweeps(ctx.clone());

    #[cfg(feature = "http")]
    if cli.http {
        let transport_config =
            protocol::http::HttpTransportConfig { host: "127.0.0.1".to_string(), port: cli.port };
        if let Err(e) = protocol::http::HttpTransport::new(transport_config).run(ctx).await {
            error!("HTTP transport exited with error: {e}");
            std::process::exit(2);
        }
        return;
    }

    let server = McpServer::new(ctx);
    if let Err(e) = StdioTransport::new().run(server).await {
        error!("stdio transport exited with error: {e}");
        std::process::exit(2);
    }
}
