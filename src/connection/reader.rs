//! Inbound side of a connection.
//!
//! The reader performs the handshake, then decodes frames until the peer
//! closes, breaks the protocol, or the connection is cancelled. It answers
//! pings, reassembles fragmented text, and delivers complete messages to the
//! application on its own task.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;
use tracing::{debug, trace, warn};

use crate::codec::FrameReader;
use crate::config::Config;
use crate::connection::shutdown::Shutdown;
use crate::connection::{ConnectionId, ReaderHandle, ReaderState, WriterHandle};
use crate::error::{Error, Result};
use crate::protocol::handshake;
use crate::protocol::{Frame, MessageAssembler, OpCode};
use crate::server::{Context, Handler, Registry};

pub struct Reader<R> {
    id: ConnectionId,
    io: FrameReader<R>,
    handle: ReaderHandle,
    writer: WriterHandle,
    registry: Registry,
    handler: Arc<dyn Handler>,
    assembler: MessageAssembler,
    handshake_timeout: Duration,
    shutdown: Shutdown,
    state: ReaderState,
}

impl<R: AsyncRead> Reader<R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ConnectionId,
        io: R,
        handle: ReaderHandle,
        writer: WriterHandle,
        registry: Registry,
        handler: Arc<dyn Handler>,
        config: &Config,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            id,
            io: FrameReader::new(io, config.limits.clone()),
            handle,
            writer,
            registry,
            handler,
            assembler: MessageAssembler::new(config.limits.clone()),
            handshake_timeout: config.timeouts.handshake,
            shutdown,
            state: ReaderState::Handshaking,
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    fn context(&self) -> Context<'_> {
        Context::new(self.id, &self.registry)
    }
}

impl<R: AsyncRead + Unpin> Reader<R> {
    /// Serve the connection until it ends.
    ///
    /// `on_close` fires exactly once if `on_connect` fired, whatever ended
    /// the connection. Teardown always runs before returning.
    pub async fn run(mut self) -> Result<()> {
        let result = self.serve().await;
        match &result {
            Ok(()) => debug!(peer = %self.id, "reader stopped"),
            Err(e) if e.is_transport() => debug!(peer = %self.id, error = %e, "transport closed"),
            Err(e) => warn!(peer = %self.id, error = %e, "dropping connection"),
        }

        if self.state.was_connected() {
            self.state = ReaderState::Closing;
            self.handler.on_close(&self.context());
        }
        self.state = ReaderState::Closed;
        self.shutdown.trigger();
        result
    }

    async fn serve(&mut self) -> Result<()> {
        let cancel = self.handle.token().clone();

        let request = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            request = tokio::time::timeout(self.handshake_timeout, self.io.read_handshake()) => {
                request.map_err(|_| Error::HandshakeTimeout)??
            }
        };
        let response = handshake::negotiate(&request)?;

        // the response must be first in the queue, so the entry opens only after it
        self.writer.send_raw(response);
        self.handle.mark_open();
        self.state = ReaderState::Connected;
        debug!(peer = %self.id, "connection upgraded");
        self.handler.on_connect(&self.context());

        loop {
            let frame = tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                frame = self.io.read_frame() => frame,
            };

            let frame = match frame {
                Ok(frame) => frame,
                Err(Error::ConnectionClosed) => {
                    trace!(peer = %self.id, "peer hung up");
                    self.state = ReaderState::Closing;
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            if !self.handle_frame(frame)? {
                return Ok(());
            }
        }
    }

    /// Returns false once the connection should stop.
    fn handle_frame(&mut self, frame: Frame) -> Result<bool> {
        match frame.opcode {
            OpCode::Ping => {
                trace!(peer = %self.id, len = frame.payload().len(), "ping");
                self.writer.pong(frame.into_payload());
            }
            OpCode::Pong => trace!(peer = %self.id, "pong ignored"),
            OpCode::Close => {
                debug!(peer = %self.id, "close frame received");
                self.state = ReaderState::Closing;
                return Ok(false);
            }
            OpCode::Text | OpCode::Continuation => {
                if let Some(message) = self.assembler.push(&frame)? {
                    let text = message.into_text()?;
                    self.handler.on_message(&self.context(), &text);
                }
            }
            OpCode::Binary => return Err(Error::UnsupportedOpcode(OpCode::Binary.as_u8())),
        }
        Ok(true)
    }
}

impl<R> Drop for Reader<R> {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}
