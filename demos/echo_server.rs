//! Echo server: replies to every message with the same text plus `!`.
//!
//! Run with: cargo run --example echo_server -- --port 8888
//! Set `RUST_LOG=wsserve=debug` to see connection lifecycle events.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wsserve::{Config, Context, DEFAULT_PORT, Handler, Server};

#[derive(Parser, Debug)]
#[command(about = "WebSocket echo server", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

struct EchoServer;

impl Handler for EchoServer {
    fn on_connect(&self, ctx: &Context<'_>) {
        info!("connection from {}:{}", ctx.address(), ctx.port());
    }

    fn on_message(&self, ctx: &Context<'_>, message: &str) {
        info!("message from {}: {}", ctx.port(), message);
        ctx.send(&format!("{message}!"));
    }

    fn on_close(&self, ctx: &Context<'_>) {
        info!("disconnected: {}:{}", ctx.address(), ctx.port());
    }
}

#[tokio::main]
async fn main() -> wsserve::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let listener = Server::new(Config::new().with_port(args.port), EchoServer)
        .bind()
        .await?;

    listener
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
