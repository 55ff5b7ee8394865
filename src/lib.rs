//! # wsserve
//!
//! A small multi-client WebSocket server for RFC 6455 text messaging.
//!
//! Each accepted TCP connection is upgraded with the HTTP handshake and then
//! served by two tokio tasks: a reader that decodes frames and delivers
//! complete text messages to your [`Handler`], and a writer that drains the
//! connection's outbound queue. Handlers can reply to the sender, broadcast
//! to everyone, or broadcast to everyone else through the [`Registry`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use wsserve::{Config, Context, Handler, Server};
//!
//! struct Echo;
//!
//! impl Handler for Echo {
//!     fn on_message(&self, ctx: &Context<'_>, message: &str) {
//!         ctx.send(message);
//!     }
//! }
//!
//! # async fn run() -> wsserve::Result<()> {
//! let listener = Server::new(Config::new().with_port(8888), Echo).bind().await?;
//! listener.run().await
//! # }
//! ```
//!
//! Outbound frames are never masked and outbound messages larger than
//! [`Config::fragment_size`] are split into continuation frames. Binary
//! messages and extensions are not supported.

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod server;

pub use config::{Config, Limits, Timeouts, DEFAULT_PORT};
pub use connection::ConnectionId;
pub use error::{Error, ErrorCategory, Result};
pub use protocol::{compute_accept_key, Frame, OpCode, WS_GUID};
pub use server::{Context, Handler, Listener, Registry, Server};
