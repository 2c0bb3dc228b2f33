//! Delivery hand-off
//!
//! [`DeliverHandler`] is the last stage the core owns: it passes every
//! `Deliver` event to a [`DeliverySink`]. Which sink is plugged in decides
//! whether dispatch runs inline on the traversal's thread ([`FnSink`]) or on
//! an independent task fed through an unbounded channel, in which case a
//! slow consumer cannot hold up the ack that committed the message.
//!
//! [`delivery_sink`] builds either flavour from the configured
//! [`DeliveryMode`]. In channel mode the returned drain task keeps running
//! until every sender is gone, i.e. until the pipeline owning the sink has
//! been dropped; await it before shutting down or queued triggers are lost.

use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::config::DeliveryMode;
use crate::pipeline::{DeliverEvent, Event, EventKind, Handler, PipelineContext};
use crate::utils::error::PipelineError;

/// Downstream consumer of delivery triggers.
pub trait DeliverySink: Send + Sync {
    fn deliver(&self, event: DeliverEvent) -> Result<(), PipelineError>;
}

impl DeliverySink for UnboundedSender<DeliverEvent> {
    fn deliver(&self, event: DeliverEvent) -> Result<(), PipelineError> {
        self.send(event).map_err(|rejected| PipelineError::DeliverySinkClosed {
            message_id: rejected.0.message_id,
        })
    }
}

/// Runs a closure inline for each delivery trigger.
pub struct FnSink<F>(pub F);

impl<F> DeliverySink for FnSink<F>
where
    F: Fn(DeliverEvent) + Send + Sync,
{
    fn deliver(&self, event: DeliverEvent) -> Result<(), PipelineError> {
        (self.0)(event);
        Ok(())
    }
}

pub struct DeliverHandler {
    name: String,
    sink: Arc<dyn DeliverySink>,
}

impl DeliverHandler {
    pub fn new(name: impl Into<String>, sink: Arc<dyn DeliverySink>) -> Self {
        Self {
            name: name.into(),
            sink,
        }
    }
}

impl Handler for DeliverHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handled_kinds(&self) -> &[EventKind] {
        &[EventKind::Deliver]
    }

    fn process(&self, _ctx: &mut PipelineContext<'_>, event: &Event) -> Result<(), PipelineError> {
        let Event::Deliver(deliver) = event else {
            return Err(PipelineError::InvalidEventType {
                handler: self.name.clone(),
                kind: event.kind(),
            });
        };
        debug!(handler = %self.name, message_id = %deliver.message_id, "handing message to delivery");
        self.sink.deliver(deliver.clone())
    }
}

/// Build the sink for `mode` around `dispatch`.
///
/// `Inline` runs `dispatch` on the traversal thread and returns no task.
/// `Channel` spawns a drain task on the current tokio runtime that runs
/// `dispatch` on the blocking pool, one trigger at a time, in arrival order.
pub fn delivery_sink<F>(
    mode: DeliveryMode,
    dispatch: F,
) -> (Arc<dyn DeliverySink>, Option<JoinHandle<()>>)
where
    F: Fn(DeliverEvent) + Send + Sync + 'static,
{
    match mode {
        DeliveryMode::Inline => (Arc::new(FnSink(dispatch)), None),
        DeliveryMode::Channel => {
            let (tx, mut rx) = mpsc::unbounded_channel::<DeliverEvent>();
            let dispatch = Arc::new(dispatch);
            let drain = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    let dispatch = dispatch.clone();
                    let message_id = event.message_id.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || dispatch(event)).await {
                        error!(message_id, error = %e, "delivery dispatch failed");
                    }
                }
                debug!("delivery channel closed");
            });
            (Arc::new(tx), Some(drain))
        }
    }
}
