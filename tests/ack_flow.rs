use std::sync::{Arc, Mutex};

use tempfile::tempdir;
use txack::handler::{DeliverHandler, FnSink, TxAckHandler};
use txack::persistence::{MessageEntity, MessageStore, SledStore};
use txack::pipeline::{DeliverEvent, Pipeline};
use txack::protocol::{TxHeader, TxStatus, TxStatusPacket};

fn build(store: Arc<SledStore>) -> (Pipeline, Arc<Mutex<Vec<DeliverEvent>>>) {
    let delivered = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let delivered = delivered.clone();
        FnSink(move |event: DeliverEvent| delivered.lock().unwrap().push(event))
    };
    let pipeline = Pipeline::builder()
        .add_last(Arc::new(TxAckHandler::new("tx-ack", store)))
        .add_last(Arc::new(DeliverHandler::new("deliver", Arc::new(sink))))
        .build()
        .unwrap();
    (pipeline, delivered)
}

#[test]
fn commit_ack_makes_message_deliverable() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SledStore::open(dir.path(), true).unwrap());
    assert!(store.save(&MessageEntity::new("m-1", "orders", "create", b"{}".to_vec())));
    let (pipeline, delivered) = build(store.clone());

    let packet = TxStatusPacket::new(
        TxHeader {
            message_id: "m-1".to_string(),
            topic: "orders".to_string(),
            message_type: "create".to_string(),
        },
        TxStatus::Commit,
    );
    let traversal = pipeline.fire(packet.into()).unwrap();

    assert!(traversal.sunk);
    assert!(store.query("m-1").unwrap().commit);
    assert_eq!(
        *delivered.lock().unwrap(),
        vec![DeliverEvent {
            message_id: "m-1".to_string(),
            topic: "orders".to_string(),
            message_type: "create".to_string(),
        }]
    );
}

#[test]
fn rollback_ack_removes_message() {
    let dir = tempdir().unwrap();
    let store = Arc::new(SledStore::open(dir.path(), true).unwrap());
    assert!(store.save(&MessageEntity::new("m-2", "orders", "create", b"{}".to_vec())));
    let (pipeline, delivered) = build(store.clone());

    let packet = TxStatusPacket::new(
        TxHeader {
            message_id: "m-2".to_string(),
            topic: "orders".to_string(),
            message_type: "create".to_string(),
        },
        TxStatus::Rollback,
    )
    .with_feedback("client abort");
    let traversal = pipeline.fire(packet.into()).unwrap();

    assert!(traversal.sunk);
    assert!(store.query("m-2").is_none());
    assert!(store.is_empty());
    assert!(delivered.lock().unwrap().is_empty());
}
