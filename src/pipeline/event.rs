use std::fmt;

use crate::protocol::{TxHeader, TxStatusPacket};

/// Discriminant of [`Event`], used by handlers to declare what they accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TxAck,
    Deliver,
    Sunk,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::TxAck => "tx-ack",
            EventKind::Deliver => "deliver",
            EventKind::Sunk => "sunk",
        };
        f.write_str(name)
    }
}

/// A transaction ack decoded by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxAckEvent {
    pub packet: TxStatusPacket,
}

/// Trigger for the delivery subsystem: the named message is committed and may
/// be dispatched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverEvent {
    pub message_id: String,
    pub topic: String,
    pub message_type: String,
}

impl From<&TxHeader> for DeliverEvent {
    fn from(header: &TxHeader) -> Self {
        Self {
            message_id: header.message_id.clone(),
            topic: header.topic.clone(),
            message_type: header.message_type.clone(),
        }
    }
}

/// Terminal marker closing a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SunkEvent;

/// Everything that can travel through a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    TxAck(TxAckEvent),
    Deliver(DeliverEvent),
    Sunk(SunkEvent),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::TxAck(_) => EventKind::TxAck,
            Event::Deliver(_) => EventKind::Deliver,
            Event::Sunk(_) => EventKind::Sunk,
        }
    }

    /// The message this event concerns, if any.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Event::TxAck(ack) => Some(ack.packet.message_id()),
            Event::Deliver(deliver) => Some(&deliver.message_id),
            Event::Sunk(_) => None,
        }
    }
}

impl From<TxStatusPacket> for Event {
    fn from(packet: TxStatusPacket) -> Self {
        Event::TxAck(TxAckEvent { packet })
    }
}
