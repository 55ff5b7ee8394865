//! Counters for concurrency and stress runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Counters {
    connections: AtomicUsize,
    connections_failed: AtomicUsize,
    disconnects: AtomicUsize,
    messages_sent: AtomicUsize,
    messages_received: AtomicUsize,
    errors: AtomicUsize,
}

#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<Counters>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connection(&self) {
        self.inner.connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connection_failed(&self) {
        self.inner.connections_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnect(&self) {
        self.inner.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_sent(&self) {
        self.inner.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message_received(&self) {
        self.inner.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.inner.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connections_total(&self) -> usize {
        self.inner.connections.load(Ordering::Relaxed)
    }

    pub fn connections_failed(&self) -> usize {
        self.inner.connections_failed.load(Ordering::Relaxed)
    }

    pub fn messages_sent(&self) -> usize {
        self.inner.messages_sent.load(Ordering::Relaxed)
    }

    pub fn messages_received(&self) -> usize {
        self.inner.messages_received.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> usize {
        self.inner.errors.load(Ordering::Relaxed)
    }

    pub fn report(&self) {
        println!(
            "connections={} failed={} disconnects={} sent={} received={} errors={}",
            self.connections_total(),
            self.connections_failed(),
            self.inner.disconnects.load(Ordering::Relaxed),
            self.messages_sent(),
            self.messages_received(),
            self.errors(),
        );
    }
}

/// Round-trip latency samples.
#[derive(Debug, Clone, Default)]
pub struct Latencies {
    samples: Arc<Mutex<Vec<Duration>>>,
}

impl Latencies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, sample: Duration) {
        self.samples.lock().push(sample);
    }

    /// The `pct`th percentile, or zero with no samples.
    pub fn p(&self, pct: f64) -> Duration {
        let mut samples = self.samples.lock().clone();
        if samples.is_empty() {
            return Duration::ZERO;
        }
        samples.sort_unstable();
        let rank = ((pct / 100.0) * (samples.len() - 1) as f64).round() as usize;
        samples[rank.min(samples.len() - 1)]
    }

    pub fn report(&self) {
        println!(
            "latency p50={:?} p99={:?} samples={}",
            self.p(50.0),
            self.p(99.0),
            self.samples.lock().len()
        );
    }
}
