//! Reassembly of fragmented inbound messages.

use bytes::{Bytes, BytesMut};

use crate::config::Limits;
use crate::error::{Error, Result};
use crate::protocol::{Frame, OpCode};

/// Capacity kept across messages. A buffer that grew past this for one
/// large message is released afterwards instead of being reused.
const RETAIN_CAPACITY: usize = 64 * 1024;

/// Bounded accumulator for one in-progress message.
///
/// Fragment count and total size are both capped by [`Limits`]; exceeding
/// either is an error and the caller must drop the connection.
pub struct MessageAssembler {
    buffer: BytesMut,
    fragment_count: usize,
    opcode: Option<OpCode>,
    limits: Limits,
}

impl MessageAssembler {
    pub fn new(limits: Limits) -> Self {
        Self {
            buffer: BytesMut::new(),
            fragment_count: 0,
            opcode: None,
            limits,
        }
    }

    /// Add a data frame to the message being assembled.
    /// Returns Some(complete_message) when `fin=1`, None otherwise.
    ///
    /// Control frames are ignored; they may arrive between fragments.
    pub fn push(&mut self, frame: &Frame) -> Result<Option<AssembledMessage>> {
        if frame.opcode.is_control() {
            return Ok(None);
        }

        let result = self.append(frame);
        if result.is_err() {
            self.reset();
        }
        result
    }

    fn append(&mut self, frame: &Frame) -> Result<Option<AssembledMessage>> {
        match (frame.opcode, self.opcode) {
            (OpCode::Continuation, None) => {
                return Err(Error::ProtocolViolation(
                    "Unexpected continuation frame".into(),
                ));
            }
            (OpCode::Continuation, Some(_)) => {}
            (_, Some(_)) => {
                return Err(Error::ProtocolViolation(
                    "Expected continuation frame".into(),
                ));
            }
            (opcode, None) => self.opcode = Some(opcode),
        }

        self.limits.check_fragment_count(self.fragment_count + 1)?;
        self.limits
            .check_message_size(self.buffer.len() + frame.payload().len())?;

        self.buffer.extend_from_slice(frame.payload());
        self.fragment_count += 1;

        if !frame.fin {
            return Ok(None);
        }

        let message = AssembledMessage {
            opcode: self.opcode.unwrap_or(OpCode::Text),
            payload: Bytes::copy_from_slice(&self.buffer),
        };
        self.reset();
        Ok(Some(message))
    }

    /// Number of fragments buffered for the current message.
    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    pub fn is_assembling(&self) -> bool {
        self.opcode.is_some()
    }

    pub fn reset(&mut self) {
        if self.buffer.capacity() > RETAIN_CAPACITY {
            self.buffer = BytesMut::new();
        } else {
            self.buffer.clear();
        }
        self.fragment_count = 0;
        self.opcode = None;
    }
}

/// A fully assembled message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledMessage {
    pub opcode: OpCode,
    pub payload: Bytes,
}

impl AssembledMessage {
    /// Decode the payload as UTF-8 text.
    pub fn into_text(self) -> Result<String> {
        String::from_utf8(self.payload.to_vec()).map_err(Error::from)
    }
}
