use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::connection::ConnectionId;
use crate::server::Registry;

/// Teardown shared by a connection's reader and writer.
///
/// Whichever side finishes first cancels the other and removes the registry
/// entry; later triggers only re-cancel. The serial keeps a stale teardown
/// from removing a newer connection that reuses the same peer address.
#[derive(Debug, Clone)]
pub struct Shutdown {
    id: ConnectionId,
    serial: u64,
    registry: Registry,
    cancel: CancellationToken,
    fired: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new(id: ConnectionId, serial: u64, registry: Registry, cancel: CancellationToken) -> Self {
        Self {
            id,
            serial,
            registry,
            cancel,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel both sides and deregister. Idempotent.
    pub fn trigger(&self) {
        self.cancel.cancel();
        if !self.fired.swap(true, Ordering::AcqRel) {
            let removed = self.registry.release(self.id, self.serial);
            debug!(peer = %self.id, removed, "connection torn down");
        }
    }
}
