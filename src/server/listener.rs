//! TCP accept loop.

use std::future::{Future, pending};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connection::{
    ConnectionEntry, ConnectionId, Reader, ReaderHandle, Shutdown, Writer, WriterHandle,
};
use crate::error::Result;
use crate::server::{Handler, Registry};

/// Backoff after a failed `accept`, so fd exhaustion doesn't spin the loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// A configured server that has not bound its port yet.
pub struct Server {
    config: Config,
    handler: Arc<dyn Handler>,
    registry: Registry,
}

impl Server {
    pub fn new(config: Config, handler: impl Handler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
            registry: Registry::new(),
        }
    }

    /// The registry the server's connections will live in.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Bind `0.0.0.0:port`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`](crate::Error::Io) if the port cannot be bound.
    pub async fn bind(self) -> Result<Listener> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, self.config.port)).await?;
        info!(addr = %listener.local_addr()?, "listening");
        Ok(Listener {
            listener,
            config: self.config,
            handler: self.handler,
            registry: self.registry,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            next_serial: 0,
        })
    }
}

/// A bound server, ready to accept connections.
pub struct Listener {
    listener: TcpListener,
    config: Config,
    handler: Arc<dyn Handler>,
    registry: Registry,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    next_serial: u64,
}

impl Listener {
    /// The address actually bound; useful with port 0.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Token that stops the accept loop and every connection when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Accept connections until the shutdown token is cancelled.
    pub async fn run(self) -> Result<()> {
        self.run_until(pending()).await
    }

    /// Accept connections until `signal` resolves or the shutdown token is
    /// cancelled, then close every connection and wait for its tasks.
    pub async fn run_until<F>(mut self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(signal);
        let shutdown = self.shutdown.clone();

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = &mut signal => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_connection(stream, peer),
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        info!(connections = self.registry.len(), "shutting down");
        self.shutdown.cancel();
        self.registry.close_all();
        self.tracker.close();
        self.tracker.wait().await;
        debug!("all connections closed");
        Ok(())
    }

    fn spawn_connection(&mut self, stream: TcpStream, peer: SocketAddr) {
        let id = ConnectionId::from(peer);
        if let Err(e) = stream.set_nodelay(true) {
            debug!(peer = %id, error = %e, "set_nodelay failed");
        }

        let serial = self.next_serial;
        self.next_serial += 1;

        let cancel = self.shutdown.child_token();
        let (writer, queue) = WriterHandle::channel(id, cancel.clone(), self.config.max_send_queue);
        let reader = ReaderHandle::new(cancel.clone());
        let entry = ConnectionEntry::new(serial, reader.clone(), writer.clone());
        if let Err(e) = self.registry.register(id, entry) {
            warn!(peer = %id, error = %e, "rejecting connection");
            return;
        }

        let shutdown = Shutdown::new(id, serial, self.registry.clone(), cancel);
        let (read_half, write_half) = stream.into_split();

        let reader = Reader::new(
            id,
            read_half,
            reader,
            writer,
            self.registry.clone(),
            Arc::clone(&self.handler),
            &self.config,
            shutdown.clone(),
        );
        let writer = Writer::new(id, write_half, queue, self.config.fragment_size, shutdown);

        self.tracker.spawn(async move {
            let _ = reader.run().await;
        });
        self.tracker.spawn(async move {
            let _ = writer.run().await;
        });
        info!(peer = %id, "accepted connection");
    }
}
