//! Raw TCP WebSocket client for integration testing.
//!
//! Speaks just enough of the client side of RFC 6455 to drive the server:
//! the upgrade request, masked outbound frames, and unmasked inbound frames.

use std::net::SocketAddr;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use wsserve::protocol::{Frame, OpCode};
use wsserve::{Error, Result, compute_accept_key};

pub struct TestClient {
    stream: TcpStream,
    buf: BytesMut,
    mask: [u8; 4],
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with_id(addr, 0).await
    }

    /// Connect and complete the handshake. `id` seeds the key and mask so
    /// concurrent clients differ on the wire.
    pub async fn connect_with_id(addr: SocketAddr, id: usize) -> Result<Self> {
        let mut client = Self::connect_raw(addr, id).await?;
        let key = Self::key_for(id);
        let request = format!(
            "GET /chat HTTP/1.1\r\n\
             Host: {addr}\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Key: {key}\r\n\
             Sec-WebSocket-Version: 13\r\n\
             \r\n"
        );
        client.send_raw(request.as_bytes()).await?;

        let response = client.read_handshake_response().await?;
        if !response.starts_with("HTTP/1.1 101 Switching Protocols\r\n") {
            return Err(Error::InvalidHandshake(response));
        }
        let expected = format!("Sec-WebSocket-Accept: {}\r\n", compute_accept_key(&key));
        if !response.contains(&expected) {
            return Err(Error::InvalidHandshake(response));
        }
        Ok(client)
    }

    /// Open the TCP connection without sending anything.
    pub async fn connect_raw(addr: SocketAddr, id: usize) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let seed = (id as u32).wrapping_mul(0x9E37_79B9) | 1;
        Ok(Self {
            stream,
            buf: BytesMut::with_capacity(4096),
            mask: seed.to_be_bytes(),
        })
    }

    pub fn key_for(id: usize) -> String {
        let mut nonce = [0u8; 16];
        nonce[..8].copy_from_slice(&(id as u64).to_be_bytes());
        nonce[8..].copy_from_slice(b"wsserve!");
        STANDARD.encode(nonce)
    }

    /// Read the server's upgrade response up to and including the blank line.
    pub async fn read_handshake_response(&mut self) -> Result<String> {
        loop {
            if let Some(end) = self.buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = self.buf.split_to(end + 4);
                return Ok(String::from_utf8_lossy(&head).into_owned());
            }
            if self.stream.read_buf(&mut self.buf).await? == 0 {
                return Err(Error::ConnectionClosed);
            }
        }
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        Ok(())
    }

    /// Send a frame masked with this client's key.
    pub async fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        let mut out = BytesMut::with_capacity(frame.wire_size(true));
        frame.encode(Some(self.mask), &mut out);
        self.send_raw(&out).await
    }

    /// Send a frame without masking it.
    pub async fn send_unmasked(&mut self, frame: &Frame) -> Result<()> {
        let mut out = BytesMut::with_capacity(frame.wire_size(false));
        frame.encode(None, &mut out);
        self.send_raw(&out).await
    }

    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.send_frame(&Frame::text(Bytes::copy_from_slice(text.as_bytes())))
            .await
    }

    /// Send `text` split into frames of at most `size` bytes.
    pub async fn send_fragmented(&mut self, text: &str, size: usize) -> Result<()> {
        let chunks: Vec<&[u8]> = text.as_bytes().chunks(size.max(1)).collect();
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            let opcode = if i == 0 { OpCode::Text } else { OpCode::Continuation };
            let frame = Frame::new(i == last, opcode, Bytes::copy_from_slice(chunk));
            self.send_frame(&frame).await?;
        }
        Ok(())
    }

    /// Next frame from the server, or `None` once the server hangs up.
    pub async fn recv_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match Frame::parse(&self.buf) {
                Ok((frame, consumed)) => {
                    self.buf.advance(consumed);
                    return Ok(Some(frame));
                }
                Err(Error::IncompleteFrame { .. }) => {}
                Err(e) => return Err(e),
            }
            match self.stream.read_buf(&mut self.buf).await {
                Ok(0) => return Ok(None),
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::ConnectionReset => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Next complete text message, reassembling fragments and skipping
    /// control frames. `None` once the server hangs up.
    pub async fn recv_text(&mut self) -> Result<Option<String>> {
        let mut message = Vec::new();
        while let Some(frame) = self.recv_frame().await? {
            if frame.is_masked() {
                return Err(Error::ProtocolViolation("server frame was masked".into()));
            }
            match frame.opcode {
                OpCode::Text | OpCode::Continuation => {
                    message.extend_from_slice(frame.payload());
                    if frame.fin {
                        return Ok(Some(String::from_utf8(message)?));
                    }
                }
                _ => {}
            }
        }
        Ok(None)
    }

    /// Like [`recv_text`](Self::recv_text), but gives up after `wait`.
    pub async fn recv_text_timeout(&mut self, wait: Duration) -> Option<String> {
        tokio::time::timeout(wait, self.recv_text())
            .await
            .ok()
            .and_then(|r| r.ok())
            .flatten()
    }

    /// True if the server closes the connection within `wait`.
    pub async fn expect_closed(&mut self, wait: Duration) -> bool {
        let drained = async {
            loop {
                match self.recv_frame().await {
                    Ok(Some(_)) => continue,
                    Ok(None) | Err(_) => return,
                }
            }
        };
        tokio::time::timeout(wait, drained).await.is_ok()
    }

    /// Send a close frame and hang up.
    pub async fn close(mut self) -> Result<()> {
        self.send_frame(&Frame::close()).await?;
        self.stream.shutdown().await?;
        Ok(())
    }
}
