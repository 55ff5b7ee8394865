//! Inbound frame header validation.
//!
//! Runs on the header alone, before any payload bytes are read, so a
//! hostile length or opcode never causes an allocation.

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::frame::FrameHeader;

/// Validator for client-to-server frame headers.
#[derive(Debug, Clone)]
pub struct FrameValidator {
    limits: Limits,
}

impl FrameValidator {
    /// Create a new frame validator.
    pub fn new(limits: Limits) -> Self {
        Self { limits }
    }

    /// Check the fixed two-byte prefix.
    ///
    /// # Errors
    ///
    /// - `Error::UnmaskedClientFrame` if the mask bit is clear
    /// - `Error::UnsupportedOpcode` for binary frames
    /// - `Error::ReservedBitsSet` if any RSV bit is set
    pub fn validate_header(&self, header: &FrameHeader) -> Result<()> {
        if !header.masked {
            return Err(Error::UnmaskedClientFrame);
        }
        if !header.opcode.is_accepted_inbound() {
            return Err(Error::UnsupportedOpcode(header.opcode.as_u8()));
        }
        if header.rsv != 0 {
            return Err(Error::ReservedBitsSet);
        }
        Ok(())
    }

    /// Check the resolved payload length.
    ///
    /// # Errors
    ///
    /// - `Error::ControlFrameTooLarge` for control payloads over 125 bytes
    /// - `Error::FrameTooLarge` if the length exceeds `max_frame_size`
    pub fn validate_length(&self, header: &FrameHeader, payload_len: u64) -> Result<()> {
        if header.opcode.is_control() && header.len7 > 125 {
            return Err(Error::ControlFrameTooLarge(
                usize::try_from(payload_len).unwrap_or(usize::MAX),
            ));
        }
        self.limits.check_frame_size(payload_len)
    }
}
