//! Transactional-ack handler
//!
//! Interprets a transaction ack against the message store:
//! - `Commit`: commit the stored message; only when that succeeds is a
//!   `Deliver` event forwarded, so an uncommitted message is never handed to
//!   delivery.
//! - `Rollback`: delete the stored message. Nothing is forwarded.
//! - `Unknown`: leave the store untouched.
//!
//! Store failures are logged and end the branch; they never fail the
//! traversal. Every ack, whatever its outcome, is closed with a `Sunk` event.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::persistence::MessageStore;
use crate::pipeline::{DeliverEvent, Event, EventKind, Handler, PipelineContext, SunkEvent};
use crate::protocol::TxStatus;
use crate::utils::error::PipelineError;

pub struct TxAckHandler {
    name: String,
    store: Arc<dyn MessageStore>,
}

impl TxAckHandler {
    pub fn new(name: impl Into<String>, store: Arc<dyn MessageStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }
}

impl Handler for TxAckHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn handled_kinds(&self) -> &[EventKind] {
        &[EventKind::TxAck]
    }

    fn process(&self, ctx: &mut PipelineContext<'_>, event: &Event) -> Result<(), PipelineError> {
        let Event::TxAck(ack) = event else {
            return Err(PipelineError::InvalidEventType {
                handler: self.name.clone(),
                kind: event.kind(),
            });
        };

        let packet = &ack.packet;
        let header = &packet.header;

        match packet.status {
            TxStatus::Commit => {
                if self.store.commit(&header.message_id) {
                    info!(
                        handler = %self.name,
                        message_id = %header.message_id,
                        topic = %header.topic,
                        "message committed"
                    );
                    ctx.forward(Event::Deliver(DeliverEvent::from(header)))?;
                } else {
                    error!(
                        handler = %self.name,
                        message_id = %header.message_id,
                        "commit failed; message will not be delivered"
                    );
                }
            }
            TxStatus::Rollback => {
                if self.store.rollback(&header.message_id) {
                    info!(handler = %self.name, message_id = %header.message_id, "message rolled back");
                } else {
                    error!(
                        handler = %self.name,
                        message_id = %header.message_id,
                        feedback = packet.feedback.as_deref().unwrap_or(""),
                        "rollback failed"
                    );
                }
            }
            TxStatus::Unknown => {
                debug!(handler = %self.name, message_id = %header.message_id, "unknown transaction status; ignored");
            }
        }

        ctx.forward(Event::Sunk(SunkEvent))
    }
}
