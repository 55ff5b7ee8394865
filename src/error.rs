//! Error types for the WebSocket server.
//!
//! Every error is scoped to a single connection except
//! [`Error::DuplicateConnection`], which is raised by the registry.

use thiserror::Error;

use crate::connection::ConnectionId;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving a WebSocket connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Missing or malformed upgrade request.
    #[error("Invalid handshake: {0}")]
    InvalidHandshake(String),

    /// Upgrade request exceeded the configured size.
    #[error("Handshake too large: {size} bytes (max: {max})")]
    HandshakeTooLarge {
        /// Bytes received so far.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// The client did not finish its upgrade request in time.
    #[error("Handshake timed out")]
    HandshakeTimeout,

    /// Protocol violation detected.
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Client frames must be masked.
    #[error("Client frame must be masked")]
    UnmaskedClientFrame,

    /// Opcode is valid on the wire but not accepted by this server.
    #[error("Unsupported opcode: {0:#x}")]
    UnsupportedOpcode(u8),

    /// Reserved opcode used.
    #[error("Reserved opcode: {0:#x}")]
    ReservedOpcode(u8),

    /// Invalid opcode value.
    #[error("Invalid opcode: {0:#x}")]
    InvalidOpcode(u8),

    /// Reserved bits set without extension.
    #[error("Reserved bits set without negotiated extension")]
    ReservedBitsSet,

    /// Control frame fragmented (RFC violation).
    #[error("Control frames cannot be fragmented")]
    FragmentedControlFrame,

    /// Control frame payload too large (>125 bytes).
    #[error("Control frame payload too large: {0} bytes (max: 125)")]
    ControlFrameTooLarge(usize),

    /// Too many fragments in a single message.
    #[error("Too many fragments: {count} (max: {max})")]
    TooManyFragments {
        /// Actual fragment count.
        count: usize,
        /// Maximum allowed fragments.
        max: usize,
    },

    /// Frame size exceeds configured maximum.
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge {
        /// Declared frame payload size.
        size: u64,
        /// Maximum allowed size.
        max: usize,
    },

    /// Message size exceeds configured maximum.
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Accumulated message size.
        size: usize,
        /// Maximum allowed size.
        max: usize,
    },

    /// Invalid UTF-8 in a text message.
    #[error("Invalid UTF-8 in text message")]
    InvalidUtf8,

    /// Incomplete frame data in a buffer.
    #[error("Incomplete frame: need {needed} more bytes")]
    IncompleteFrame {
        /// Number of additional bytes needed.
        needed: usize,
    },

    /// The peer closed the transport.
    #[error("Connection closed")]
    ConnectionClosed,

    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),

    /// A connection with the same identifier is already registered.
    #[error("Connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
}

/// Coarse classification of [`Error`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The upgrade exchange failed; the connection never opened.
    Handshake,
    /// The peer broke the framing rules; closed without a close frame.
    Protocol,
    /// Read or write failure, or the peer went away.
    Transport,
    /// Registry bookkeeping failure.
    Registry,
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Error::InvalidHandshake(_) | Error::HandshakeTooLarge { .. } | Error::HandshakeTimeout => {
                ErrorCategory::Handshake
            }
            Error::ConnectionClosed | Error::Io(_) => ErrorCategory::Transport,
            Error::DuplicateConnection(_) => ErrorCategory::Registry,
            _ => ErrorCategory::Protocol,
        }
    }

    /// True for errors caused by the transport rather than the peer's bytes.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self.category(), ErrorCategory::Transport)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::ConnectionClosed,
            _ => Error::Io(err.to_string()),
        }
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(_: std::string::FromUtf8Error) -> Self {
        Error::InvalidUtf8
    }
}
