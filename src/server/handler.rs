//! Application callbacks.

use std::net::{IpAddr, SocketAddr};

use crate::connection::ConnectionId;
use crate::server::Registry;

/// Callbacks invoked by a connection's reader task.
///
/// One handler is shared by every connection, so implementations must be
/// `Send + Sync`. Callbacks for a single connection never overlap; callbacks
/// for different connections may run concurrently.
///
/// ```no_run
/// use wsserve::server::{Context, Handler};
///
/// struct Echo;
///
/// impl Handler for Echo {
///     fn on_message(&self, ctx: &Context<'_>, message: &str) {
///         ctx.send(&format!("{message}!"));
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// The handshake completed; the connection can now receive messages.
    fn on_connect(&self, _ctx: &Context<'_>) {}

    /// A complete text message arrived.
    fn on_message(&self, ctx: &Context<'_>, message: &str);

    /// The connection ended. Fires once per connection that saw `on_connect`.
    fn on_close(&self, _ctx: &Context<'_>) {}
}

/// The connection a callback is running for, plus access to its peers.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    id: ConnectionId,
    registry: &'a Registry,
}

impl<'a> Context<'a> {
    pub fn new(id: ConnectionId, registry: &'a Registry) -> Self {
        Self { id, registry }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn address(&self) -> IpAddr {
        self.id.address()
    }

    pub fn peer(&self) -> SocketAddr {
        self.id.peer()
    }

    pub fn port(&self) -> u16 {
        self.id.port()
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Queue a message back to this connection.
    pub fn send(&self, text: &str) -> bool {
        self.registry.send(self.id, text)
    }

    /// Queue a message for every open connection, this one included.
    pub fn send_to_all(&self, text: &str) -> usize {
        self.registry.send_to_all(text)
    }

    /// Queue a message for every open connection except this one.
    pub fn send_to_others(&self, text: &str) -> usize {
        self.registry.send_to_others(text, self.id)
    }

    /// Ask this connection to shut down.
    pub fn close(&self) -> bool {
        self.registry.close(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionEntry, Outbound, ReaderHandle, WriterHandle};
    use bytes::Bytes;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_context_targets() {
        let registry = Registry::new();
        let me = ConnectionId::from(([10, 0, 0, 1], 1111));
        let peer = ConnectionId::from(([10, 0, 0, 2], 2222));

        let mut queues = Vec::new();
        for (serial, id) in [me, peer].into_iter().enumerate() {
            let token = CancellationToken::new();
            let (writer, queue) = WriterHandle::channel(id, token.clone(), 16);
            let reader = ReaderHandle::new(token);
            reader.mark_open();
            registry
                .register(id, ConnectionEntry::new(serial as u64, reader, writer))
                .unwrap();
            queues.push(queue);
        }

        let ctx = Context::new(me, &registry);
        assert_eq!(ctx.port(), 1111);
        assert!(ctx.send("self"));
        assert_eq!(ctx.send_to_others("others"), 1);
        assert_eq!(ctx.send_to_all("all"), 2);

        let mine: Vec<_> = std::iter::from_fn(|| queues[0].try_recv().ok()).collect();
        let theirs: Vec<_> = std::iter::from_fn(|| queues[1].try_recv().ok()).collect();
        assert_eq!(
            mine,
            vec![
                Outbound::Message(Bytes::from_static(b"self")),
                Outbound::Message(Bytes::from_static(b"all")),
            ]
        );
        assert_eq!(
            theirs,
            vec![
                Outbound::Message(Bytes::from_static(b"others")),
                Outbound::Message(Bytes::from_static(b"all")),
            ]
        );

        assert!(ctx.close());
    }
}
