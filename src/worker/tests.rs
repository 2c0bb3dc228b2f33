use std::io::{self, BufReader, Cursor, Read};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use super::{AckWorker, InflightAcks, WorkerStats, forward_packets, spawn_line_reader};
use crate::config::DeliveryMode;
use crate::handler::{DeliverHandler, TxAckHandler, delivery_sink};
use crate::persistence::{MemoryStore, MessageEntity, MessageStore};
use crate::pipeline::{DeliverEvent, Event, Pipeline, SunkEvent};
use crate::protocol::{TxHeader, TxStatus, TxStatusPacket};

fn ack(message_id: &str, status: TxStatus) -> Event {
    TxStatusPacket::new(
        TxHeader {
            message_id: message_id.to_string(),
            topic: "orders".to_string(),
            message_type: "create".to_string(),
        },
        status,
    )
    .into()
}

/// Backend whose first commit of `gated_id` waits for the test to open a
/// gate and then fails, as a slow database timing out would. Every other
/// commit goes through.
struct GatedStore {
    inner: MemoryStore,
    gated_id: &'static str,
    gate: Mutex<Option<std_mpsc::Receiver<()>>>,
}

impl GatedStore {
    fn new(gated_id: &'static str) -> (Self, std_mpsc::Sender<()>) {
        let (open, gate) = std_mpsc::channel();
        let store = Self {
            inner: MemoryStore::new(),
            gated_id,
            gate: Mutex::new(Some(gate)),
        };
        (store, open)
    }
}

impl MessageStore for GatedStore {
    fn query(&self, message_id: &str) -> Option<MessageEntity> {
        self.inner.query(message_id)
    }

    fn save(&self, entity: &MessageEntity) -> bool {
        self.inner.save(entity)
    }

    fn commit(&self, message_id: &str) -> bool {
        if message_id != self.gated_id {
            return self.inner.commit(message_id);
        }
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.recv();
            return false;
        }
        self.inner.commit(message_id)
    }

    fn delete(&self, message_id: &str) -> bool {
        self.inner.delete(message_id)
    }

    fn update_entity(&self, entity: &MessageEntity) -> bool {
        self.inner.update_entity(entity)
    }
}

/// Reader fed chunk by chunk from another thread; blocks until the next
/// chunk arrives and reports end of input once the feeding side hangs up.
struct Pipe {
    chunks: std_mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl Read for Pipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.chunks.recv() {
                Ok(chunk) => self.pending = chunk,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.pending.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

fn pipeline_with_channel(
    store: Arc<dyn MessageStore>,
) -> (Arc<Pipeline>, mpsc::UnboundedReceiver<DeliverEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let pipeline = Pipeline::builder()
        .add_last(Arc::new(TxAckHandler::new("tx-ack", store)))
        .add_last(Arc::new(DeliverHandler::new("deliver", Arc::new(tx))))
        .build()
        .unwrap();
    (Arc::new(pipeline), rx)
}

#[test]
fn test_inflight_acquire_and_release() {
    let inflight = InflightAcks::new();
    let guard = inflight.try_acquire("m-1").unwrap();
    assert_eq!(guard.message_id(), "m-1");
    assert!(inflight.contains("m-1"));
    assert!(inflight.try_acquire("m-1").is_none());
    assert!(inflight.try_acquire("m-2").is_some());

    drop(guard);
    assert!(!inflight.contains("m-1"));
    assert!(inflight.is_empty());
    assert!(inflight.try_acquire("m-1").is_some());
}

#[tokio::test]
async fn test_worker_commits_every_ack() {
    let store = Arc::new(MemoryStore::new());
    for i in 0..32 {
        let entity = MessageEntity::new(format!("m-{i}"), "orders", "create", vec![]);
        assert!(store.save(&entity));
    }
    let (pipeline, mut delivered) = pipeline_with_channel(store.clone());
    let (tx, rx) = mpsc::channel(8);

    let worker = tokio::spawn(AckWorker::new(pipeline, 4).run(rx));
    for i in 0..32 {
        tx.send(ack(&format!("m-{i}"), TxStatus::Commit)).await.unwrap();
    }
    drop(tx);
    let stats = worker.await.unwrap();

    assert_eq!(
        stats,
        WorkerStats {
            completed: 32,
            failed: 0,
            deferred: 0,
            rejected: 0
        }
    );
    for i in 0..32 {
        assert!(store.query(&format!("m-{i}")).unwrap().commit);
    }
    let mut ids = Vec::new();
    while let Ok(event) = delivered.try_recv() {
        ids.push(event.message_id);
    }
    ids.sort();
    let mut expected: Vec<_> = (0..32).map(|i| format!("m-{i}")).collect();
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_worker_rejects_parked_ack_when_message_stays_busy() {
    let store = Arc::new(MemoryStore::new());
    assert!(store.save(&MessageEntity::new("m-1", "orders", "create", vec![])));
    assert!(store.save(&MessageEntity::new("m-2", "orders", "create", vec![])));
    let (pipeline, _delivered) = pipeline_with_channel(store.clone());
    let worker = AckWorker::new(pipeline, 2);
    let held = worker.inflight().try_acquire("m-1").unwrap();
    let (tx, rx) = mpsc::channel(4);

    tx.send(ack("m-1", TxStatus::Rollback)).await.unwrap();
    tx.send(ack("m-2", TxStatus::Commit)).await.unwrap();
    drop(tx);
    let stats = worker.run(rx).await;
    drop(held);

    assert_eq!(stats.deferred, 1);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.completed, 1);
    // the parked rollback never reached the store
    assert!(store.query("m-1").is_some());
    assert!(store.query("m-2").unwrap().commit);
}

#[tokio::test]
async fn test_worker_counts_aborted_traversals() {
    let store = Arc::new(MemoryStore::new());
    assert!(store.save(&MessageEntity::new("m-1", "orders", "create", vec![])));
    let (pipeline, delivered) = pipeline_with_channel(store.clone());
    drop(delivered);
    let (tx, rx) = mpsc::channel(4);

    tx.send(ack("m-1", TxStatus::Commit)).await.unwrap();
    tx.send(Event::Sunk(SunkEvent)).await.unwrap();
    tx.send(Event::Sunk(SunkEvent)).await.unwrap();
    drop(tx);
    let stats = AckWorker::new(pipeline, 1).run(rx).await;

    assert_eq!(
        stats,
        WorkerStats {
            completed: 2,
            failed: 1,
            deferred: 0,
            rejected: 0
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_worker_runs_resent_ack_after_first_attempt_finishes() {
    let (store, open_gate) = GatedStore::new("m-1");
    let store = Arc::new(store);
    assert!(store.save(&MessageEntity::new("m-1", "orders", "create", vec![])));
    assert!(store.save(&MessageEntity::new("m-2", "orders", "create", vec![])));
    let (pipeline, mut delivered) = pipeline_with_channel(store.clone());
    let (tx, rx) = mpsc::channel(1);
    let worker = tokio::spawn(AckWorker::new(pipeline, 4).run(rx));

    tx.send(ack("m-1", TxStatus::Commit)).await.unwrap();
    tx.send(ack("m-1", TxStatus::Commit)).await.unwrap();
    tx.send(ack("m-2", TxStatus::Commit)).await.unwrap();
    // m-2 is admitted after the re-sent m-1, so once it lands the resend is parked
    tokio::time::timeout(Duration::from_secs(5), async {
        while !store.query("m-2").is_some_and(|entity| entity.commit) {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert!(!store.query("m-1").unwrap().commit);

    open_gate.send(()).unwrap();
    drop(tx);
    let stats = worker.await.unwrap();

    assert_eq!(
        stats,
        WorkerStats {
            completed: 3,
            failed: 0,
            deferred: 1,
            rejected: 0
        }
    );
    assert!(store.query("m-1").unwrap().commit);
    let mut ids = Vec::new();
    while let Ok(event) = delivered.try_recv() {
        ids.push(event.message_id);
    }
    assert_eq!(ids, vec!["m-2".to_string(), "m-1".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_channel_delivery_consumes_every_trigger_before_shutdown() {
    const ACKS: usize = 24;
    let store = Arc::new(MemoryStore::new());
    for i in 0..ACKS {
        let entity = MessageEntity::new(format!("m-{i}"), "orders", "create", vec![]);
        assert!(store.save(&entity));
    }
    let consumed = Arc::new(Mutex::new(Vec::new()));
    let (sink, drain) = {
        let consumed = consumed.clone();
        delivery_sink(DeliveryMode::Channel, move |event: DeliverEvent| {
            // a slow consumer keeps triggers queued after the worker is done
            std::thread::sleep(Duration::from_millis(2));
            consumed.lock().unwrap().push(event.message_id);
        })
    };
    let drain = drain.expect("channel mode runs a drain task");
    let pipeline = Pipeline::builder()
        .add_last(Arc::new(TxAckHandler::new("tx-ack", store)))
        .add_last(Arc::new(DeliverHandler::new("deliver", sink)))
        .build()
        .unwrap();
    let (tx, rx) = mpsc::channel(8);
    let worker = tokio::spawn(AckWorker::new(Arc::new(pipeline), 4).run(rx));

    for i in 0..ACKS {
        tx.send(ack(&format!("m-{i}"), TxStatus::Commit)).await.unwrap();
    }
    drop(tx);
    let stats = worker.await.unwrap();
    drain.await.unwrap();

    assert_eq!(stats.completed, ACKS);
    let mut ids = consumed.lock().unwrap().clone();
    ids.sort();
    let mut expected: Vec<_> = (0..ACKS).map(|i| format!("m-{i}")).collect();
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn test_forward_packets_skips_blank_and_malformed_lines() {
    let input = concat!(
        r#"{"header":{"message_id":"m-1","topic":"orders","message_type":"create"},"status":"commit"}"#,
        "\n\n",
        "not json\n",
        r#"{"header":{"message_id":"m-2","topic":"orders","message_type":"create"},"status":"rollback","feedback":"client abort"}"#,
        "\n",
    );
    let lines = spawn_line_reader(Cursor::new(input.as_bytes().to_vec()), 4);
    let (tx, mut rx) = mpsc::channel(8);

    let forwarded = forward_packets(lines, tx).await;

    assert_eq!(forwarded, 2);
    let mut ids = Vec::new();
    while let Some(event) = rx.recv().await {
        ids.push(event.message_id().unwrap_or_default().to_string());
    }
    assert_eq!(ids, vec!["m-1".to_string(), "m-2".to_string()]);
}

#[test]
fn test_runtime_shuts_down_while_intake_waits_for_input() {
    let (feed, chunks) = std_mpsc::channel::<Vec<u8>>();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap();

    let first = runtime.block_on(async {
        let mut lines = spawn_line_reader(
            BufReader::new(Pipe {
                chunks,
                pending: Vec::new(),
            }),
            4,
        );
        feed.send(b"first\n".to_vec()).unwrap();
        lines.recv().await
    });
    assert_eq!(first.as_deref(), Some("first"));

    // the reader thread is still parked in read(); shutdown must not wait on it
    let started = Instant::now();
    drop(runtime);
    assert!(started.elapsed() < Duration::from_secs(1));
    drop(feed);
}
