//! Opening handshake (RFC 6455 section 4.2).
//!
//! The server only needs one thing from the client's upgrade request: the
//! `Sec-WebSocket-Key` header. Everything here is a pure function of the
//! request bytes; transmission is the caller's job.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation.
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

const KEY_HEADER: &str = "Sec-WebSocket-Key";

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use wsserve::protocol::handshake::compute_accept_key;
///
/// let accept = compute_accept_key("dGhlIHNhbXBsZSBub25jZQ==");
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// The part of a client upgrade request the server acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeRequest {
    /// The Sec-WebSocket-Key header value, trimmed.
    pub key: String,
}

impl HandshakeRequest {
    /// Extract the websocket key from a raw upgrade request.
    ///
    /// Header names match case-insensitively. Lines before the first
    /// header (the request line) and after the blank line are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHandshake`] if the request is not UTF-8 or has
    /// no non-empty `Sec-WebSocket-Key` header.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::InvalidHandshake("Invalid UTF-8".into()))?;

        let key = text
            .split("\r\n")
            .skip(1)
            .take_while(|line| !line.is_empty())
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(KEY_HEADER))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| Error::InvalidHandshake(format!("Missing {KEY_HEADER} header")))?;

        Ok(Self {
            key: key.to_string(),
        })
    }
}

/// The server's `101 Switching Protocols` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResponse {
    /// The Sec-WebSocket-Accept value.
    pub accept: String,
}

impl HandshakeResponse {
    /// Build the response for a parsed request.
    #[must_use]
    pub fn from_request(request: &HandshakeRequest) -> Self {
        Self {
            accept: compute_accept_key(&request.key),
        }
    }

    /// Render the response, terminated by a blank line.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        Bytes::from(format!(
            "HTTP/1.1 101 Switching Protocols\r\n\
             Upgrade: websocket\r\n\
             Connection: Upgrade\r\n\
             Sec-WebSocket-Accept: {}\r\n\
             \r\n",
            self.accept
        ))
    }
}

/// Parse a request and render the matching response in one step.
///
/// # Errors
///
/// See [`HandshakeRequest::parse`].
pub fn negotiate(request: &[u8]) -> Result<Bytes> {
    let request = HandshakeRequest::parse(request)?;
    Ok(HandshakeResponse::from_request(&request).to_bytes())
}
