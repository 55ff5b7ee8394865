//! Handles to a connection's reader and writer, as held by the registry.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::connection::ConnectionId;
use crate::protocol::frame::MAX_CONTROL_FRAME_PAYLOAD;

/// One item on a connection's outbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Application text, framed and fragmented by the writer.
    Message(Bytes),
    /// Bytes written as-is. Only the handshake response uses this.
    Raw(Bytes),
    /// A ping frame.
    Ping(Bytes),
    /// A pong frame.
    Pong(Bytes),
}

/// Receiving end of an outbound queue; owned by exactly one writer.
pub type OutboundQueue = mpsc::Receiver<Outbound>;

/// Producer side of a connection's outbound queue.
///
/// Cloneable; any task may enqueue. Enqueueing never blocks. The queue holds
/// at most `capacity` items: a peer that falls that far behind is not
/// reading, so the connection is cancelled instead of buffering more.
#[derive(Debug, Clone)]
pub struct WriterHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Outbound>,
    cancel: CancellationToken,
}

impl WriterHandle {
    /// Create a handle and the queue its writer will drain.
    #[must_use]
    pub fn channel(id: ConnectionId, cancel: CancellationToken, capacity: usize) -> (Self, OutboundQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { id, tx, cancel }, rx)
    }

    fn enqueue(&self, item: Outbound) -> bool {
        match self.tx.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    peer = %self.id,
                    capacity = self.tx.max_capacity(),
                    "outbound queue full, closing slow connection"
                );
                self.cancel.cancel();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    pub fn send(&self, text: Bytes) -> bool {
        self.enqueue(Outbound::Message(text))
    }

    pub fn send_raw(&self, bytes: Bytes) -> bool {
        self.enqueue(Outbound::Raw(bytes))
    }

    /// Enqueue a ping. Payloads over 125 bytes are refused.
    pub fn ping(&self, payload: Bytes) -> bool {
        payload.len() <= MAX_CONTROL_FRAME_PAYLOAD && self.enqueue(Outbound::Ping(payload))
    }

    pub fn pong(&self, payload: Bytes) -> bool {
        self.enqueue(Outbound::Pong(payload))
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Control handle for a connection's reader.
#[derive(Debug, Clone)]
pub struct ReaderHandle {
    cancel: CancellationToken,
    open: Arc<AtomicBool>,
}

impl ReaderHandle {
    #[must_use]
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            open: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True once the handshake response has been queued.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn mark_open(&self) {
        self.open.store(true, Ordering::Release);
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}

/// Registry entry: the reader and writer handles of one connection.
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    pub(crate) serial: u64,
    pub reader: ReaderHandle,
    pub writer: WriterHandle,
}

impl ConnectionEntry {
    #[must_use]
    pub fn new(serial: u64, reader: ReaderHandle, writer: WriterHandle) -> Self {
        Self {
            serial,
            reader,
            writer,
        }
    }

    /// Signal cancellation to both reader and writer.
    pub fn cancel(&self) {
        self.reader.cancel();
        self.writer.cancel();
    }

    /// Whether application traffic may be queued yet.
    pub fn is_open(&self) -> bool {
        self.reader.is_open()
    }
}
