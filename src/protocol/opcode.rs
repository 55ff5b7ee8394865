//! Frame opcodes.

use crate::error::{Error, Result};

/// WebSocket frame opcode.
///
/// `Binary` is decoded structurally but the server refuses it inbound and
/// never emits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Continuation frame (0x0).
    Continuation = 0x0,
    /// Text frame (0x1).
    Text = 0x1,
    /// Binary frame (0x2).
    Binary = 0x2,
    /// Close frame (0x8).
    Close = 0x8,
    /// Ping frame (0x9).
    Ping = 0x9,
    /// Pong frame (0xA).
    Pong = 0xA,
}

impl OpCode {
    /// Wire value of the opcode nibble.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Close, Ping and Pong.
    #[inline]
    #[must_use]
    pub const fn is_control(self) -> bool {
        matches!(self, OpCode::Close | OpCode::Ping | OpCode::Pong)
    }

    /// Opcodes this server accepts from clients: everything except Binary.
    #[inline]
    #[must_use]
    pub const fn is_accepted_inbound(self) -> bool {
        !matches!(self, OpCode::Binary)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            OpCode::Continuation => "Continuation",
            OpCode::Text => "Text",
            OpCode::Binary => "Binary",
            OpCode::Close => "Close",
            OpCode::Ping => "Ping",
            OpCode::Pong => "Pong",
        }
    }
}

impl TryFrom<u8> for OpCode {
    type Error = Error;

    /// Decodes the low nibble of the first header byte. 0x3-0x7 and 0xB-0xF
    /// are reserved; anything wider than four bits is not an opcode at all.
    fn try_from(byte: u8) -> Result<Self> {
        Ok(match byte {
            0x0 => OpCode::Continuation,
            0x1 => OpCode::Text,
            0x2 => OpCode::Binary,
            0x8 => OpCode::Close,
            0x9 => OpCode::Ping,
            0xA => OpCode::Pong,
            0x3..=0x7 | 0xB..=0xF => return Err(Error::ReservedOpcode(byte)),
            _ => return Err(Error::InvalidOpcode(byte)),
        })
    }
}

impl From<OpCode> for u8 {
    fn from(opcode: OpCode) -> u8 {
        opcode.as_u8()
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
