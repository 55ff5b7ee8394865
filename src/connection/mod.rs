//! Per-connection machinery.
//!
//! Every accepted socket is split into a [`Reader`] and a [`Writer`], each
//! running on its own task:
//!
//! 1. **Handshaking** - the reader reads the upgrade request and queues the
//!    response as the first outbound item
//! 2. **Connected** - the reader decodes frames and calls the application;
//!    the writer drains the outbound queue
//! 3. **Closed** - either side stops, cancels the other, and removes the
//!    registry entry
//!
//! The two sides share nothing but the outbound queue, a cancellation token,
//! and a [`Shutdown`] handle.

mod handle;
mod id;
mod reader;
mod shutdown;
mod state;
mod writer;

pub mod fragmenter;

pub use handle::{ConnectionEntry, Outbound, OutboundQueue, ReaderHandle, WriterHandle};
pub use id::ConnectionId;
pub use reader::Reader;
pub use shutdown::Shutdown;
pub use state::{ReaderState, WriterState};
pub use writer::Writer;
