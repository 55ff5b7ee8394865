//! Test servers bound to an OS-assigned port.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wsserve::{Config, Context, ConnectionId, Handler, Registry, Result, Server};

/// Replies to every message with the same text.
pub struct EchoHandler;

impl Handler for EchoHandler {
    fn on_message(&self, ctx: &Context<'_>, message: &str) {
        ctx.send(message);
    }
}

/// Relays every message to every other connection.
pub struct RelayHandler;

impl Handler for RelayHandler {
    fn on_message(&self, ctx: &Context<'_>, message: &str) {
        ctx.send_to_others(message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect(ConnectionId),
    Message(ConnectionId, String),
    Close(ConnectionId),
}

/// Echoes like [`EchoHandler`] and records every callback.
#[derive(Default, Clone)]
pub struct RecordingHandler {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingHandler {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }
}

impl Handler for RecordingHandler {
    fn on_connect(&self, ctx: &Context<'_>) {
        self.events.lock().push(Event::Connect(ctx.id()));
    }

    fn on_message(&self, ctx: &Context<'_>, message: &str) {
        self.events
            .lock()
            .push(Event::Message(ctx.id(), message.to_string()));
        ctx.send(message);
    }

    fn on_close(&self, ctx: &Context<'_>) {
        self.events.lock().push(Event::Close(ctx.id()));
    }
}

pub struct TestServer {
    registry: Registry,
    shutdown: CancellationToken,
    task: JoinHandle<Result<()>>,
}

impl TestServer {
    /// Spawn an echo server.
    pub async fn spawn() -> (Self, SocketAddr) {
        Self::spawn_with(Config::new(), EchoHandler).await
    }

    pub async fn spawn_with(config: Config, handler: impl Handler) -> (Self, SocketAddr) {
        let listener = Server::new(config.with_port(0), handler)
            .bind()
            .await
            .expect("bind test server");
        let port = listener.local_addr().expect("local addr").port();
        let server = Self {
            registry: listener.registry().clone(),
            shutdown: listener.shutdown_token(),
            task: tokio::spawn(listener.run()),
        };
        (server, SocketAddr::from(([127, 0, 0, 1], port)))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Wait until the registry holds `n` connections.
    pub async fn wait_for_connections(&self, n: usize) {
        while self.registry.len() != n {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }

    /// Stop accepting, close every connection, and wait for their tasks.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.task
            .await
            .expect("server task panicked")
            .expect("server failed");
        assert!(self.registry.is_empty());
    }
}
