//! Splitting of outgoing messages into frames.

use bytes::Bytes;

use crate::protocol::{Frame, OpCode};

/// Iterator that produces frames from a message payload.
///
/// Splits large payloads into frames of at most `fragment_size` bytes. The
/// first frame carries the original opcode, the rest use
/// `OpCode::Continuation`, and only the last has `fin` set. Fragments share
/// the payload's allocation.
pub struct MessageFragmenter {
    payload: Bytes,
    opcode: OpCode,
    fragment_size: usize,
    offset: usize,
    is_first: bool,
}

impl MessageFragmenter {
    /// Create a new fragmenter for the given payload.
    #[inline]
    #[must_use]
    pub fn new(payload: Bytes, opcode: OpCode, fragment_size: usize) -> Self {
        Self {
            payload,
            opcode,
            fragment_size: fragment_size.max(1),
            offset: 0,
            is_first: true,
        }
    }
}

impl Iterator for MessageFragmenter {
    type Item = Frame;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.payload.len() {
            // an empty message is still one frame
            if self.is_first {
                self.is_first = false;
                return Some(Frame::new(true, self.opcode, Bytes::new()));
            }
            return None;
        }

        let end = self.payload.len().min(self.offset + self.fragment_size);
        let chunk = self.payload.slice(self.offset..end);
        self.offset = end;

        let opcode = if self.is_first {
            self.is_first = false;
            self.opcode
        } else {
            OpCode::Continuation
        };

        Some(Frame::new(end == self.payload.len(), opcode, chunk))
    }
}
