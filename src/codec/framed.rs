use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::Limits;
use crate::connection::fragmenter::MessageFragmenter;
use crate::error::{Error, Result};
use crate::protocol::frame::{FrameHeader, MAX_HEADER_SIZE};
use crate::protocol::mask::apply_mask_fast;
use crate::protocol::{Frame, FrameValidator, OpCode};

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// Read half of a connection: the upgrade request, then client frames.
///
/// Every field of a frame is read with `read_exact`, so a transport that
/// delivers partial data is looped over until the full count arrives or
/// the stream ends.
pub struct FrameReader<R> {
    io: BufReader<R>,
    limits: Limits,
    validator: FrameValidator,
}

impl<R: AsyncRead> FrameReader<R> {
    #[must_use]
    pub fn new(io: R, limits: Limits) -> Self {
        Self {
            io: BufReader::new(io),
            validator: FrameValidator::new(limits.clone()),
            limits,
        }
    }

    #[must_use]
    pub fn into_inner(self) -> R {
        self.io.into_inner()
    }
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Read the upgrade request up to and including its blank line.
    ///
    /// Bytes after the blank line stay buffered for [`read_frame`](Self::read_frame).
    ///
    /// # Errors
    ///
    /// - `Error::HandshakeTooLarge` past `max_handshake_size`
    /// - `Error::ConnectionClosed` if the peer hangs up first
    pub async fn read_handshake(&mut self) -> Result<Vec<u8>> {
        let max = self.limits.max_handshake_size;
        let mut request = Vec::with_capacity(max.min(1024));

        loop {
            let remaining = (max + 1).saturating_sub(request.len()) as u64;
            let n = (&mut self.io)
                .take(remaining)
                .read_until(b'\n', &mut request)
                .await?;
            self.limits.check_handshake_size(request.len())?;

            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            if request.ends_with(HEADER_TERMINATOR) {
                return Ok(request);
            }
        }
    }

    /// Read and unmask the next client frame.
    ///
    /// The header is validated before the payload is read, so disallowed
    /// opcodes, unmasked frames and oversized lengths are rejected without
    /// buffering the payload.
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionClosed` if the stream ends
    /// - `Error::UnmaskedClientFrame`, `Error::UnsupportedOpcode`,
    ///   `Error::ReservedOpcode`, `Error::ReservedBitsSet`
    /// - `Error::FrameTooLarge`, `Error::ControlFrameTooLarge`,
    ///   `Error::FragmentedControlFrame`
    pub async fn read_frame(&mut self) -> Result<Frame> {
        let mut prefix = [0u8; 2];
        self.io.read_exact(&mut prefix).await?;
        let header = FrameHeader::parse(prefix)?;
        self.validator.validate_header(&header)?;

        let mut ext = [0u8; 8];
        let ext = &mut ext[..header.extended_len_size()];
        self.io.read_exact(ext).await?;
        let payload_len = header.payload_len(ext)?;
        self.validator.validate_length(&header, payload_len)?;

        let mut key = [0u8; 4];
        self.io.read_exact(&mut key).await?;

        let len = usize::try_from(payload_len).map_err(|_| Error::FrameTooLarge {
            size: payload_len,
            max: self.limits.max_frame_size,
        })?;
        let mut payload = BytesMut::zeroed(len);
        self.io.read_exact(&mut payload).await?;
        apply_mask_fast(&mut payload, key);

        let frame = Frame::from_parts(header, Some(key), payload.freeze());
        frame.validate()?;
        Ok(frame)
    }
}

/// Write half of a connection. Server frames are never masked.
pub struct FrameWriter<W> {
    io: W,
    write_buf: BytesMut,
    fragment_size: usize,
}

impl<W> FrameWriter<W> {
    #[must_use]
    pub fn new(io: W, fragment_size: usize) -> Self {
        Self {
            io,
            write_buf: BytesMut::with_capacity(fragment_size.min(64 * 1024) + MAX_HEADER_SIZE),
            fragment_size,
        }
    }

    #[must_use]
    pub fn into_inner(self) -> W {
        self.io
    }
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Write bytes unframed. Only used for the handshake response.
    pub async fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.io.write_all(bytes).await?;
        self.io.flush().await?;
        Ok(())
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.write_buf.clear();
        frame.encode(None, &mut self.write_buf);
        self.io.write_all(&self.write_buf).await?;
        Ok(())
    }

    /// Write a data message, splitting it into continuation frames when it
    /// exceeds the fragment size.
    pub async fn write_message(&mut self, opcode: OpCode, payload: Bytes) -> Result<()> {
        for frame in MessageFragmenter::new(payload, opcode, self.fragment_size) {
            self.write_frame(&frame).await?;
        }
        self.flush().await
    }

    pub async fn write_control(&mut self, frame: &Frame) -> Result<()> {
        self.write_frame(frame).await?;
        self.flush().await
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.io.flush().await?;
        Ok(())
    }

    /// Shut down the write direction of the transport.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.io.shutdown().await?;
        Ok(())
    }
}
