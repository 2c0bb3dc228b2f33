//! Ack worker
//!
//! Consumes events from a bounded `mpsc` queue until every sender is dropped,
//! then waits for the traversals it started and reports what happened.
//!
//! Notes:
//! - Traversals are independent; a slow store call stalls only its own
//!   traversal, but once `max_concurrent` of them are stuck the worker stops
//!   pulling from the queue, which pushes back on the producer.
//! - Only tx-ack events are deduplicated by message id. An ack that arrives
//!   while another ack for the same message is in flight is parked and
//!   started, in arrival order, once the earlier one finishes, so a
//!   publisher's re-sent ack still runs if the first attempt failed. Acks
//!   still parked when the queue closes and nothing is left running for
//!   their message are dropped and counted as rejected.
//! - There is no timeout here. A hung store call hangs its traversal.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::pipeline::{Event, EventKind, Pipeline};
use crate::worker::inflight::{InflightAcks, InflightGuard};

/// Outcome counters for one worker run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Traversals that returned `Ok`.
    pub completed: usize,
    /// Traversals that returned an error or whose task panicked.
    pub failed: usize,
    /// Acks that had to wait for an earlier ack on the same message.
    pub deferred: usize,
    /// Parked acks that never got to run.
    pub rejected: usize,
}

/// Acks waiting for their message id to come free, oldest first.
type Parked = HashMap<String, VecDeque<Event>>;

pub struct AckWorker {
    pipeline: Arc<Pipeline>,
    limiter: Arc<Semaphore>,
    inflight: InflightAcks,
}

impl AckWorker {
    pub fn new(pipeline: Arc<Pipeline>, max_concurrent: usize) -> Self {
        Self {
            pipeline,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            inflight: InflightAcks::new(),
        }
    }

    pub fn inflight(&self) -> &InflightAcks {
        &self.inflight
    }

    /// Run until the queue closes and every started traversal has finished.
    pub async fn run(self, mut events: mpsc::Receiver<Event>) -> WorkerStats {
        let mut stats = WorkerStats::default();
        let mut traversals = JoinSet::new();
        let mut parked = Parked::new();

        loop {
            tokio::select! {
                received = events.recv() => {
                    let Some(event) = received else { break };
                    self.admit(event, &mut parked, &mut traversals, &mut stats).await;
                }
                Some(finished) = traversals.join_next(), if !traversals.is_empty() => {
                    Self::record(&mut stats, finished);
                    self.release_parked(&mut parked, &mut traversals).await;
                }
            }
        }

        while let Some(finished) = traversals.join_next().await {
            Self::record(&mut stats, finished);
            self.release_parked(&mut parked, &mut traversals).await;
        }

        for (message_id, queue) in parked {
            warn!(message_id, dropped = queue.len(), "parked acks never got to run");
            stats.rejected += queue.len();
        }

        info!(
            completed = stats.completed,
            failed = stats.failed,
            deferred = stats.deferred,
            rejected = stats.rejected,
            "ack worker stopped"
        );
        stats
    }

    async fn admit(
        &self,
        event: Event,
        parked: &mut Parked,
        traversals: &mut JoinSet<bool>,
        stats: &mut WorkerStats,
    ) {
        let guard = match event.kind() {
            EventKind::TxAck => {
                let message_id = event.message_id().unwrap_or_default().to_string();
                let guard = if parked.contains_key(&message_id) {
                    None
                } else {
                    self.inflight.try_acquire(&message_id)
                };
                let Some(guard) = guard else {
                    debug!(message_id, "ack already in flight for this message; parked");
                    stats.deferred += 1;
                    parked.entry(message_id).or_default().push_back(event);
                    return;
                };
                Some(guard)
            }
            _ => None,
        };
        self.launch(event, guard, traversals).await;
    }

    /// Start the oldest parked ack of every message id that is free again.
    async fn release_parked(&self, parked: &mut Parked, traversals: &mut JoinSet<bool>) {
        let waiting: Vec<String> = parked.keys().cloned().collect();
        for message_id in waiting {
            let Some(guard) = self.inflight.try_acquire(&message_id) else {
                continue;
            };
            let Some(queue) = parked.get_mut(&message_id) else {
                continue;
            };
            let Some(event) = queue.pop_front() else {
                parked.remove(&message_id);
                continue;
            };
            if queue.is_empty() {
                parked.remove(&message_id);
            }
            self.launch(event, Some(guard), traversals).await;
        }
    }

    async fn launch(
        &self,
        event: Event,
        guard: Option<InflightGuard>,
        traversals: &mut JoinSet<bool>,
    ) {
        let Ok(permit) = self.limiter.clone().acquire_owned().await else {
            error!("traversal limiter closed; event dropped");
            return;
        };

        let pipeline = self.pipeline.clone();
        let span = info_span!("traversal", id = %Uuid::new_v4());
        traversals.spawn_blocking(move || {
            let _entered = span.enter();
            let _permit = permit;
            let _guard = guard;
            match pipeline.fire(event) {
                Ok(traversal) => {
                    debug!(handled = traversal.handled, sunk = traversal.sunk, "traversal finished");
                    true
                }
                Err(e) => {
                    error!(error = %e, "traversal aborted");
                    false
                }
            }
        });
    }

    fn record(stats: &mut WorkerStats, finished: Result<bool, JoinError>) {
        match finished {
            Ok(true) => stats.completed += 1,
            Ok(false) => stats.failed += 1,
            Err(e) => {
                error!(error = %e, "traversal task panicked");
                stats.failed += 1;
            }
        }
    }
}
