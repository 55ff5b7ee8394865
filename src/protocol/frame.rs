//! Frame encoding and decoding (RFC 6455 section 5.2).
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |F|R|R|R| opcode|M| Payload len |    Extended payload length    |
//! |I|S|S|S|  (4)  |A|     (7)     |             (16/64)           |
//! |N|V|V|V|       |S|             |   (if payload len==126/127)   |
//! | |1|2|3|       |K|             |                               |
//! +-+-+-+-+-------+-+-------------+-------------------------------+
//! |                 Masking key (if MASK set)                     |
//! +---------------------------------------------------------------+
//! |                     Payload data                              |
//! +---------------------------------------------------------------+
//! ```
//!
//! Length classes: 0..=125 is stored inline, 126..=65535 uses the `126`
//! marker and a 16-bit length, anything larger uses `127` and a 64-bit
//! length. The decoder rejects lengths that are not minimally encoded.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::protocol::OpCode;
use crate::protocol::mask::apply_mask_fast;

/// Maximum payload size for control frames.
pub const MAX_CONTROL_FRAME_PAYLOAD: usize = 125;

/// Largest possible header: 2 fixed + 8 extended length + 4 mask key.
pub const MAX_HEADER_SIZE: usize = 14;

const LEN_16: u8 = 126;
const LEN_64: u8 = 127;

/// The fixed two-byte prefix of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Final fragment flag.
    pub fin: bool,
    /// The three RSV bits, right-aligned.
    pub rsv: u8,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Whether a masking key follows the length.
    pub masked: bool,
    /// The 7-bit length field, possibly a 126/127 marker.
    pub len7: u8,
}

impl FrameHeader {
    /// Decode the first two bytes of a frame.
    ///
    /// # Errors
    ///
    /// Returns `Error::ReservedOpcode` for reserved opcode values.
    pub fn parse(bytes: [u8; 2]) -> Result<Self> {
        let [byte0, byte1] = bytes;
        Ok(Self {
            fin: byte0 & 0x80 != 0,
            rsv: (byte0 >> 4) & 0x07,
            opcode: OpCode::try_from(byte0 & 0x0F)?,
            masked: byte1 & 0x80 != 0,
            len7: byte1 & 0x7F,
        })
    }

    /// Number of extended length bytes that follow: 0, 2 or 8.
    #[inline]
    #[must_use]
    pub const fn extended_len_size(&self) -> usize {
        match self.len7 {
            LEN_16 => 2,
            LEN_64 => 8,
            _ => 0,
        }
    }

    /// Resolve the payload length from the extended length bytes.
    ///
    /// `ext` must hold exactly [`extended_len_size`](Self::extended_len_size) bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::ProtocolViolation` for a non-minimal encoding or a
    /// 64-bit length with the most significant bit set.
    pub fn payload_len(&self, ext: &[u8]) -> Result<u64> {
        match (self.len7, ext) {
            (LEN_16, &[a, b]) => {
                let len = u16::from_be_bytes([a, b]);
                if len < u16::from(LEN_16) {
                    return Err(Error::ProtocolViolation(format!(
                        "length {len} must use the 7-bit form"
                    )));
                }
                Ok(u64::from(len))
            }
            (LEN_64, &[a, b, c, d, e, f, g, h]) => {
                let len = u64::from_be_bytes([a, b, c, d, e, f, g, h]);
                if len <= u64::from(u16::MAX) {
                    return Err(Error::ProtocolViolation(format!(
                        "length {len} must use the 16-bit form"
                    )));
                }
                if len >> 63 != 0 {
                    return Err(Error::ProtocolViolation(
                        "64-bit length has its most significant bit set".into(),
                    ));
                }
                Ok(len)
            }
            (len7, &[]) if len7 < LEN_16 => Ok(u64::from(len7)),
            _ => Err(Error::ProtocolViolation(
                "extended length size mismatch".into(),
            )),
        }
    }
}

/// A single WebSocket frame.
///
/// Decoded frames carry their payload already unmasked; `mask` records the
/// key the client used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Final fragment flag. True if this is the last fragment of a message.
    pub fin: bool,
    /// RSV1-3, right-aligned. Always zero for frames this server builds.
    pub rsv: u8,
    /// Frame opcode.
    pub opcode: OpCode,
    /// Masking key, present iff the frame was masked on the wire.
    pub mask: Option<[u8; 4]>,
    payload: Bytes,
}

impl Frame {
    /// Create a new unmasked frame.
    #[must_use]
    pub fn new(fin: bool, opcode: OpCode, payload: impl Into<Bytes>) -> Self {
        Self {
            fin,
            rsv: 0,
            opcode,
            mask: None,
            payload: payload.into(),
        }
    }

    /// Create a final text frame.
    #[must_use]
    pub fn text(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Text, data)
    }

    /// Create a ping frame.
    #[must_use]
    pub fn ping(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Ping, data)
    }

    /// Create a pong frame.
    #[must_use]
    pub fn pong(data: impl Into<Bytes>) -> Self {
        Self::new(true, OpCode::Pong, data)
    }

    /// Create an empty close frame.
    #[must_use]
    pub fn close() -> Self {
        Self::new(true, OpCode::Close, Bytes::new())
    }

    /// Get the payload bytes.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length as carried in the header.
    #[inline]
    #[must_use]
    pub fn payload_len(&self) -> u64 {
        self.payload.len() as u64
    }

    /// Whether the frame was masked on the wire.
    #[inline]
    #[must_use]
    pub const fn is_masked(&self) -> bool {
        self.mask.is_some()
    }

    /// Take ownership of the payload.
    #[must_use]
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    pub(crate) fn from_parts(header: FrameHeader, mask: Option<[u8; 4]>, payload: Bytes) -> Self {
        Self {
            fin: header.fin,
            rsv: header.rsv,
            opcode: header.opcode,
            mask,
            payload,
        }
    }

    /// Parse a complete frame from a buffer.
    ///
    /// Returns the frame and the number of bytes consumed. Masked payloads
    /// are unmasked.
    ///
    /// # Errors
    ///
    /// - `Error::IncompleteFrame` if not enough data is available
    /// - `Error::ReservedOpcode` if a reserved opcode is used
    /// - `Error::ProtocolViolation` for a non-minimal length encoding
    pub fn parse(buf: &[u8]) -> Result<(Self, usize)> {
        let needed = |have: usize, want: usize| Error::IncompleteFrame {
            needed: want - have,
        };

        if buf.len() < 2 {
            return Err(needed(buf.len(), 2));
        }
        let header = FrameHeader::parse([buf[0], buf[1]])?;

        let ext_end = 2 + header.extended_len_size();
        if buf.len() < ext_end {
            return Err(needed(buf.len(), ext_end));
        }
        let payload_len = header.payload_len(&buf[2..ext_end])?;
        let payload_len = usize::try_from(payload_len).map_err(|_| Error::FrameTooLarge {
            size: payload_len,
            max: usize::MAX,
        })?;

        let mask_end = if header.masked { ext_end + 4 } else { ext_end };
        let total = mask_end
            .checked_add(payload_len)
            .ok_or(Error::FrameTooLarge {
                size: payload_len as u64,
                max: usize::MAX - mask_end,
            })?;
        if buf.len() < total {
            return Err(needed(buf.len(), total));
        }

        let mask = header
            .masked
            .then(|| [buf[ext_end], buf[ext_end + 1], buf[ext_end + 2], buf[ext_end + 3]]);

        let mut payload = BytesMut::from(&buf[mask_end..total]);
        if let Some(key) = mask {
            apply_mask_fast(&mut payload, key);
        }

        Ok((Self::from_parts(header, mask, payload.freeze()), total))
    }

    /// Check the structural rules that do not depend on connection state.
    ///
    /// # Errors
    ///
    /// - `Error::ReservedBitsSet` if RSV bits are set (no extensions are negotiated)
    /// - `Error::FragmentedControlFrame` if a control frame has `fin=0`
    /// - `Error::ControlFrameTooLarge` if a control frame payload exceeds 125 bytes
    pub fn validate(&self) -> Result<()> {
        if self.rsv != 0 {
            return Err(Error::ReservedBitsSet);
        }

        if self.opcode.is_control() {
            if !self.fin {
                return Err(Error::FragmentedControlFrame);
            }
            if self.payload.len() > MAX_CONTROL_FRAME_PAYLOAD {
                return Err(Error::ControlFrameTooLarge(self.payload.len()));
            }
        }

        Ok(())
    }

    /// Header size for a payload of `payload_len` bytes.
    #[inline]
    #[must_use]
    pub const fn header_len(payload_len: usize, masked: bool) -> usize {
        let extended = if payload_len <= 125 {
            0
        } else if payload_len <= 0xFFFF {
            2
        } else {
            8
        };
        2 + extended + if masked { 4 } else { 0 }
    }

    /// Total encoded size of this frame.
    #[must_use]
    pub fn wire_size(&self, masked: bool) -> usize {
        Self::header_len(self.payload.len(), masked) + self.payload.len()
    }

    /// Append the wire representation of this frame to `dst`.
    ///
    /// The server always passes `None`; a key is only used to build
    /// client-side frames.
    pub fn encode(&self, mask: Option<[u8; 4]>, dst: &mut BytesMut) {
        let payload_len = self.payload.len();
        dst.reserve(self.wire_size(mask.is_some()));

        let byte0 = (u8::from(self.fin) << 7) | ((self.rsv & 0x07) << 4) | self.opcode.as_u8();
        dst.put_u8(byte0);

        let mask_bit = if mask.is_some() { 0x80 } else { 0x00 };
        if payload_len <= 125 {
            dst.put_u8(mask_bit | payload_len as u8);
        } else if let Ok(len) = u16::try_from(payload_len) {
            dst.put_u8(mask_bit | LEN_16);
            dst.put_u16(len);
        } else {
            dst.put_u8(mask_bit | LEN_64);
            dst.put_u64(payload_len as u64);
        }

        match mask {
            Some(key) => {
                dst.put_slice(&key);
                let start = dst.len();
                dst.put_slice(&self.payload);
                apply_mask_fast(&mut dst[start..], key);
            }
            None => dst.put_slice(&self.payload),
        }
    }
}
