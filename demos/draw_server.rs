//! Shared drawing board relay.
//!
//! Every message a client sends (typically a stroke such as `"12,40"`) is
//! forwarded to every other connected client; the sender gets nothing back.
//!
//! Run with: cargo run --example draw_server -- --port 8888

use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wsserve::{Config, Context, DEFAULT_PORT, Handler, Server};

#[derive(Parser, Debug)]
#[command(about = "WebSocket drawing relay", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

struct DrawServer;

impl Handler for DrawServer {
    fn on_connect(&self, ctx: &Context<'_>) {
        info!(
            peers = ctx.registry().len(),
            "connection from {}:{}",
            ctx.address(),
            ctx.port()
        );
    }

    fn on_message(&self, ctx: &Context<'_>, message: &str) {
        let delivered = ctx.send_to_others(message);
        debug!(from = ctx.port(), delivered, "stroke {}", message);
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
    let listener = Server::new(Config::new().with_port(args.port), DrawServer)
        .bind()
        .await?;

    listener
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}
