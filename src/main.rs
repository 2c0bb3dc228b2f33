//! `txack` server
//!
//! Wires the ack core together: settings, logging, the sled message store, the
//! `[tx-ack, deliver]` pipeline and the ack worker. Transaction acks are read
//! from stdin as one JSON `TxStatusPacket` per line, standing in for a real
//! transport. Delivery triggers are logged along with whether the committed
//! message has already expired.

use std::io::BufReader;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use txack::config::{Settings, load_config};
use txack::handler::{DeliverHandler, TxAckHandler, delivery_sink};
use txack::persistence::{MessageStore, SledStore};
use txack::pipeline::{DeliverEvent, Event, Pipeline};
use txack::utils::logging;
use txack::worker::{AckWorker, forward_packets, spawn_line_reader};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    logging::init(&config.logging.level);

    if let Err(e) = run(config).await {
        error!("txack failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let store: Arc<dyn MessageStore> = Arc::new(SledStore::from_settings(&config.store)?);
    info!(path = %config.store.path, "message store opened");

    let (sink, drain) = {
        let store = store.clone();
        delivery_sink(config.pipeline.delivery_mode, move |event: DeliverEvent| {
            report_delivery(store.as_ref(), &event)
        })
    };

    let pipeline = Pipeline::builder()
        .add_last(Arc::new(TxAckHandler::new("tx-ack", store.clone())))
        .add_last(Arc::new(DeliverHandler::new("deliver", sink)))
        .build()?;
    info!(handlers = ?pipeline.handler_names(), "pipeline ready");

    let (tx, rx) = mpsc::channel::<Event>(config.pipeline.queue_capacity);
    let worker = tokio::spawn(
        AckWorker::new(Arc::new(pipeline), config.pipeline.max_concurrent_traversals).run(rx),
    );

    // stdin is read on its own thread, so Ctrl-C never waits on a pending read
    let lines = spawn_line_reader(
        BufReader::new(std::io::stdin()),
        config.pipeline.queue_capacity,
    );
    tokio::select! {
        forwarded = forward_packets(lines, tx) => {
            info!(forwarded, "ack input closed. Draining in-flight acks.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Draining in-flight acks.");
        }
    }

    // every sender is gone by now, so the worker drains and stops; dropping
    // its pipeline closes the delivery channel in turn
    let stats = worker.await?;
    if let Some(drain) = drain {
        drain.await?;
    }
    info!(?stats, "txack stopped");
    Ok(())
}

fn report_delivery(store: &dyn MessageStore, event: &DeliverEvent) {
    match store.query(&event.message_id) {
        Some(entity) if entity.is_expired() => {
            warn!(message_id = %event.message_id, "committed message already expired");
        }
        Some(entity) => info!(
            message_id = %event.message_id,
            topic = %event.topic,
            message_type = %event.message_type,
            deliver_count = entity.deliver_count,
            "message ready for delivery"
        ),
        None => warn!(message_id = %event.message_id, "committed message vanished before delivery"),
    }
}
