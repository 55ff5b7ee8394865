//! WebSocket protocol core: handshake, framing, masking, reassembly.
//!
//! Nothing in this module performs I/O.

pub mod assembler;
pub mod frame;
pub mod handshake;
pub mod mask;
pub mod opcode;
pub mod validation;

pub use assembler::{AssembledMessage, MessageAssembler};
pub use frame::{Frame, FrameHeader};
pub use handshake::{HandshakeRequest, HandshakeResponse, WS_GUID, compute_accept_key};
pub use mask::{apply_mask, apply_mask_fast};
pub use opcode::OpCode;
pub use validation::FrameValidator;
