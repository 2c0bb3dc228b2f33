//! The `handler` module holds the business-logic stages of the ack pipeline.
//!
//! - `tx_ack`: turns transaction acks into store commits or rollbacks and
//!   emits the delivery trigger for committed messages.
//! - `deliver`: hands delivery triggers to the downstream dispatch subsystem
//!   through a [`DeliverySink`].

pub mod deliver;
pub mod tx_ack;

pub use deliver::{DeliverHandler, DeliverySink, FnSink, delivery_sink};
pub use tx_ack::TxAckHandler;
