//! Reader and writer lifecycle states.

/// Lifecycle of a connection's inbound side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReaderState {
    /// Waiting for the client's upgrade request.
    #[default]
    Handshaking,
    /// Upgrade complete; frames are being decoded.
    Connected,
    /// The peer sent close or hung up; `on_close` is being delivered.
    Closing,
    /// The reader has stopped.
    Closed,
}

impl ReaderState {
    /// True once the application has seen `on_connect`.
    #[must_use]
    #[inline]
    pub const fn was_connected(&self) -> bool {
        matches!(self, ReaderState::Connected | ReaderState::Closing)
    }
}

impl std::fmt::Display for ReaderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderState::Handshaking => write!(f, "Handshaking"),
            ReaderState::Connected => write!(f, "Connected"),
            ReaderState::Closing => write!(f, "Closing"),
            ReaderState::Closed => write!(f, "Closed"),
        }
    }
}

/// Lifecycle of a connection's outbound side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriterState {
    /// Dequeuing and writing items.
    #[default]
    Running,
    /// Cancelled; no further items are written.
    Draining,
    /// The writer has stopped and the write half is shut down.
    Closed,
}

impl std::fmt::Display for WriterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriterState::Running => write!(f, "Running"),
            WriterState::Draining => write!(f, "Draining"),
            WriterState::Closed => write!(f, "Closed"),
        }
    }
}
