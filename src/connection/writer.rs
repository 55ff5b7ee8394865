//! Outbound side of a connection.
//!
//! The writer is the only code that touches the write half of a socket. It
//! drains the connection's queue one item at a time, so frames are never
//! interleaved and always leave in enqueue order.

use tokio::io::AsyncWrite;
use tracing::{debug, trace};

use crate::codec::FrameWriter;
use crate::connection::handle::{Outbound, OutboundQueue};
use crate::connection::shutdown::Shutdown;
use crate::connection::{ConnectionId, WriterState};
use crate::error::Result;
use crate::protocol::{Frame, OpCode};

pub struct Writer<W> {
    id: ConnectionId,
    io: FrameWriter<W>,
    queue: OutboundQueue,
    shutdown: Shutdown,
    state: WriterState,
}

impl<W> Writer<W> {
    pub fn new(
        id: ConnectionId,
        io: W,
        queue: OutboundQueue,
        fragment_size: usize,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            id,
            io: FrameWriter::new(io, fragment_size),
            queue,
            shutdown,
            state: WriterState::Running,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }
}

impl<W: AsyncWrite + Unpin> Writer<W> {
    /// Drain the queue until cancelled, the queue closes, or a write fails.
    ///
    /// Always shuts down the write half and tears the connection down
    /// before returning.
    pub async fn run(mut self) -> Result<()> {
        self.serve().await
    }

    async fn serve(&mut self) -> Result<()> {
        let result = self.drain().await;
        match &result {
            Ok(()) => debug!(peer = %self.id, "writer stopped"),
            Err(e) => debug!(peer = %self.id, error = %e, "writer failed"),
        }

        self.state = WriterState::Closed;
        if let Err(e) = self.io.shutdown().await {
            trace!(peer = %self.id, error = %e, "write half already gone");
        }
        self.shutdown.trigger();
        result
    }

    async fn drain(&mut self) -> Result<()> {
        let cancel = self.shutdown.token().clone();

        loop {
            let item = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                item = self.queue.recv() => item,
            };
            let Some(item) = item else {
                self.state = WriterState::Draining;
                return Ok(());
            };

            // a peer that stops reading must not pin the writer past cancellation
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    self.state = WriterState::Draining;
                    return Ok(());
                }
                written = write_item(&mut self.io, item) => written?,
            }
        }
    }
}

async fn write_item<W: AsyncWrite + Unpin>(io: &mut FrameWriter<W>, item: Outbound) -> Result<()> {
    match item {
        Outbound::Raw(bytes) => io.write_raw(&bytes).await,
        Outbound::Message(text) => io.write_message(OpCode::Text, text).await,
        Outbound::Ping(payload) => io.write_control(&Frame::ping(payload)).await,
        Outbound::Pong(payload) => io.write_control(&Frame::pong(payload)).await,
    }
}

impl<W> Drop for Writer<W> {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
