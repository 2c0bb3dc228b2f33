//! Line-oriented ack intake.
//!
//! Reading happens on a plain OS thread rather than on tokio's blocking pool:
//! a read that never returns (an idle terminal, a pipe nobody closes) would
//! otherwise hold up runtime shutdown. The thread hands lines over with
//! `blocking_send` and stops as soon as the receiving side is gone.

use std::io::BufRead;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::pipeline::Event;
use crate::protocol::TxStatusPacket;

/// Read `reader` line by line on a dedicated thread.
///
/// The returned receiver yields each line without its terminator and closes
/// at end of input, on a read error, or if the thread could not be started.
pub fn spawn_line_reader<R>(reader: R, capacity: usize) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let spawned = thread::Builder::new()
        .name("txack-intake".to_string())
        .spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            debug!("intake receiver dropped");
                            return;
                        }
                    }
                    Err(e) => {
                        error!(error = %e, "reading acks failed");
                        return;
                    }
                }
            }
            debug!("ack intake reached end of input");
        });
    if let Err(e) = spawned {
        error!(error = %e, "could not start ack intake thread");
    }
    rx
}

/// Decode one JSON `TxStatusPacket` per line and queue it for the worker.
///
/// Blank lines are skipped and malformed ones are logged and skipped.
/// Returns how many packets were queued.
pub async fn forward_packets(
    mut lines: mpsc::Receiver<String>,
    events: mpsc::Sender<Event>,
) -> usize {
    let mut forwarded = 0;
    while let Some(line) = lines.recv().await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<TxStatusPacket>(line) {
            Ok(packet) => {
                if events.send(packet.into()).await.is_err() {
                    warn!("ack worker stopped; no longer accepting acks");
                    break;
                }
                forwarded += 1;
            }
            Err(e) => warn!(error = %e, "invalid transaction ack: {}", line),
        }
    }
    forwarded
}
