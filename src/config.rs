//! Configuration and limits for the WebSocket server.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8888;

/// Resource limits applied to every connection.
///
/// These bound the memory a single peer can make the server hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum payload size of a single inbound frame in bytes.
    ///
    /// Default: 16 MB (16 * 1024 * 1024)
    pub max_frame_size: usize,

    /// Maximum size of a reassembled inbound message in bytes.
    ///
    /// Default: 64 MB (64 * 1024 * 1024)
    pub max_message_size: usize,

    /// Maximum number of fragments in a single inbound message.
    ///
    /// A peer that keeps sending `fin=0` frames past this bound is
    /// disconnected.
    ///
    /// Default: 128
    pub max_fragment_count: usize,

    /// Maximum size of the upgrade request in bytes.
    ///
    /// Default: 8 KB (8192)
    pub max_handshake_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,
            max_message_size: 64 * 1024 * 1024,
            max_fragment_count: 128,
            max_handshake_size: 8192,
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(
        max_frame_size: usize,
        max_message_size: usize,
        max_fragment_count: usize,
        max_handshake_size: usize,
    ) -> Self {
        Self {
            max_frame_size,
            max_message_size,
            max_fragment_count,
            max_handshake_size,
        }
    }

    /// Validate that a reassembled message size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_message_size(&self, size: usize) -> Result<()> {
        if size > self.max_message_size {
            Err(Error::MessageTooLarge {
                size,
                max: self.max_message_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate a declared frame payload length.
    ///
    /// Takes the raw 64-bit wire length so oversized frames are rejected
    /// before any conversion to `usize`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_frame_size(&self, size: u64) -> Result<()> {
        if size > self.max_frame_size as u64 {
            Err(Error::FrameTooLarge {
                size,
                max: self.max_frame_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that fragment count is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyFragments`] if `count` exceeds the configured maximum.
    pub const fn check_fragment_count(&self, count: usize) -> Result<()> {
        if count > self.max_fragment_count {
            Err(Error::TooManyFragments {
                count,
                max: self.max_fragment_count,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that handshake size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandshakeTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_handshake_size(&self, size: usize) -> Result<()> {
        if size > self.max_handshake_size {
            Err(Error::HandshakeTooLarge {
                size,
                max: self.max_handshake_size,
            })
        } else {
            Ok(())
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeouts {
    /// Maximum time for the client to deliver its upgrade request.
    ///
    /// Default: 10 seconds
    pub handshake: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            handshake: Duration::from_secs(10),
        }
    }
}

impl Timeouts {
    /// Create new timeouts with custom values.
    #[must_use]
    pub const fn new(handshake: Duration) -> Self {
        Self { handshake }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port to listen on. Port 0 asks the OS for a free port.
    ///
    /// Default: 8888
    pub port: u16,

    /// Resource limits.
    pub limits: Limits,

    /// Maximum payload per outbound frame (in bytes).
    ///
    /// Messages larger than this are split into continuation frames.
    ///
    /// Default: 16 KB (16 * 1024)
    pub fragment_size: usize,

    /// Maximum number of items waiting on one connection's outbound queue.
    ///
    /// A connection whose queue is full when something is sent to it is
    /// closed. Values below 1 are treated as 1.
    ///
    /// Default: 1024
    pub max_send_queue: usize,

    /// Timeout configuration.
    pub timeouts: Timeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            limits: Limits::default(),
            fragment_size: 16 * 1024,
            max_send_queue: 1024,
            timeouts: Timeouts::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the listening port.
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set custom limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the maximum outbound frame payload.
    #[must_use]
    pub const fn with_fragment_size(mut self, size: usize) -> Self {
        self.fragment_size = size;
        self
    }

    /// Set the per-connection outbound queue bound.
    #[must_use]
    pub const fn with_max_send_queue(mut self, items: usize) -> Self {
        self.max_send_queue = items;
        self
    }

    /// Set timeout configuration.
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_default() {
        let limits = Limits::default();
        assert_eq!(limits.max_frame_size, 16 * 1024 * 1024);
        assert_eq!(limits.max_message_size, 64 * 1024 * 1024);
        assert_eq!(limits.max_fragment_count, 128);
        assert_eq!(limits.max_handshake_size, 8192);
    }

    #[test]
    fn test_limits_check_frame_size() {
        let limits = Limits::default();
        assert!(limits.check_frame_size(1024).is_ok());
        assert!(matches!(
            limits.check_frame_size(u64::MAX),
            Err(Error::FrameTooLarge { .. })
        ));
    }

    #[test]
    fn test_limits_check_fragment_count() {
        let limits = Limits::new(1024, 4096, 3, 1024);
        assert!(limits.check_fragment_count(3).is_ok());
        assert_eq!(
            limits.check_fragment_count(4),
            Err(Error::TooManyFragments { count: 4, max: 3 })
        );
    }

    #[test]
    fn test_limits_check_message_and_handshake() {
        let limits = Limits::default();
        assert!(limits.check_message_size(1024).is_ok());
        assert!(limits.check_message_size(100 * 1024 * 1024).is_err());
        assert!(limits.check_handshake_size(1024).is_ok());
        assert!(limits.check_handshake_size(10_000).is_err());
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.fragment_size, 16 * 1024);
        assert_eq!(config.max_send_queue, 1024);
        assert_eq!(config.timeouts.handshake, Duration::from_secs(10));
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .with_port(0)
            .with_fragment_size(4096)
            .with_max_send_queue(8)
            .with_limits(Limits::new(64, 256, 4, 512))
            .with_timeouts(Timeouts::new(Duration::from_millis(250)));

        assert_eq!(config.port, 0);
        assert_eq!(config.fragment_size, 4096);
        assert_eq!(config.max_send_queue, 8);
        assert_eq!(config.limits.max_fragment_count, 4);
        assert_eq!(config.timeouts.handshake, Duration::from_millis(250));
    }
}
