//! Shared map of live connections.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::trace;

use crate::connection::{ConnectionEntry, ConnectionId};
use crate::error::{Error, Result};

/// Thread-safe registry of connections, keyed by peer address.
///
/// Cloning is cheap; every clone sees the same map. Sends only enqueue, so
/// the lock is never held across I/O. Connections still in their handshake
/// are registered but not addressable until the upgrade response is queued.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    connections: Arc<Mutex<HashMap<ConnectionId, ConnectionEntry>>>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateConnection`] if `id` is already present.
    pub fn register(&self, id: ConnectionId, entry: ConnectionEntry) -> Result<()> {
        match self.connections.lock().entry(id) {
            Entry::Occupied(_) => Err(Error::DuplicateConnection(id)),
            Entry::Vacant(slot) => {
                slot.insert(entry);
                Ok(())
            }
        }
    }

    /// Remove a connection. Returns false if it was already gone.
    pub fn deregister(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(&id).is_some()
    }

    /// Remove `id` only if it still belongs to the connection with `serial`.
    pub(crate) fn release(&self, id: ConnectionId, serial: u64) -> bool {
        let mut connections = self.connections.lock();
        match connections.get(&id) {
            Some(entry) if entry.serial == serial => connections.remove(&id).is_some(),
            _ => false,
        }
    }

    /// Queue a text message for one connection.
    ///
    /// A no-op returning false if the connection is unknown, not yet
    /// upgraded, or already shutting down.
    pub fn send(&self, id: ConnectionId, text: &str) -> bool {
        let connections = self.connections.lock();
        match connections.get(&id) {
            Some(entry) if entry.is_open() => entry.writer.send(Bytes::copy_from_slice(text.as_bytes())),
            _ => {
                trace!(peer = %id, "send to unknown connection dropped");
                false
            }
        }
    }

    /// Queue a text message for every open connection. Returns how many
    /// connections it was queued for.
    pub fn send_to_all(&self, text: &str) -> usize {
        self.broadcast(text, None)
    }

    /// Queue a text message for every open connection except `exclude`.
    pub fn send_to_others(&self, text: &str, exclude: ConnectionId) -> usize {
        self.broadcast(text, Some(exclude))
    }

    fn broadcast(&self, text: &str, exclude: Option<ConnectionId>) -> usize {
        let payload = Bytes::copy_from_slice(text.as_bytes());
        self.connections
            .lock()
            .iter()
            .filter(|(id, entry)| Some(**id) != exclude && entry.is_open())
            .filter(|(_, entry)| entry.writer.send(payload.clone()))
            .count()
    }

    /// Queue a ping for one connection. Payloads over 125 bytes are refused.
    pub fn ping(&self, id: ConnectionId, payload: &[u8]) -> bool {
        self.connections
            .lock()
            .get(&id)
            .filter(|entry| entry.is_open())
            .is_some_and(|entry| entry.writer.ping(Bytes::copy_from_slice(payload)))
    }

    /// Signal cancellation to a connection's reader and writer.
    ///
    /// The entry is removed by the connection's own teardown.
    pub fn close(&self, id: ConnectionId) -> bool {
        match self.connections.lock().get(&id) {
            Some(entry) => {
                entry.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every registered connection. Returns how many were signalled.
    pub fn close_all(&self) -> usize {
        let connections = self.connections.lock();
        for entry in connections.values() {
            entry.cancel();
        }
        connections.len()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.connections.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    /// Identifiers of all registered connections, in no particular order.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.connections.lock().keys().copied().collect()
    }
}
