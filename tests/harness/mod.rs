//! Shared integration-test harness: a raw TCP WebSocket client, test
//! servers on ephemeral ports, and counters for concurrent runs.

#![allow(dead_code)]

mod client;
mod metrics;
mod server;

// each test binary uses a different subset
#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use metrics::{Latencies, Metrics};
#[allow(unused_imports)]
pub use server::{EchoHandler, Event, RecordingHandler, RelayHandler, TestServer};
