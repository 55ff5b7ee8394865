//! The server: accept loop, connection registry, and application callbacks.
//!
//! [`Server::bind`] opens the port and yields a [`Listener`]. Each accepted
//! socket gets a reader task and a writer task, registered in the shared
//! [`Registry`] under its [`ConnectionId`](crate::ConnectionId). The
//! application sees connections only through its [`Handler`].

mod handler;
mod listener;
mod registry;

pub use handler::{Context, Handler};
pub use listener::{Listener, Server};
pub use registry::Registry;
