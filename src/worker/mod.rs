//! The `worker` module drives the ack pipeline from an inbound event queue.
//!
//! The transport layer pushes decoded events onto a bounded channel; the
//! [`AckWorker`] pulls them off and runs one pipeline traversal per event on
//! tokio's blocking pool, since store calls are synchronous I/O. A semaphore
//! caps how many traversals run at once, and [`InflightAcks`] keeps two acks
//! for the same message out of the core at the same time. [`intake`] turns a
//! line-oriented reader into queued tx-ack events.

pub mod ack_worker;
pub mod inflight;
pub mod intake;

pub use ack_worker::{AckWorker, WorkerStats};
pub use inflight::{InflightAcks, InflightGuard};
pub use intake::{forward_packets, spawn_line_reader};

#[cfg(test)]
mod tests;
