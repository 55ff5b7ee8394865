//! Stream-level framing: frames read from and written to a byte stream.

mod framed;

pub use framed::{FrameReader, FrameWriter};
