//! The `protocol` module holds the transaction-status packet handed over by
//! the transport layer once it has decoded an ack from the wire.
//!
//! Decoding itself is the transport's business; this module only defines the
//! shape of the result.

pub mod packet;

pub use packet::{TxHeader, TxStatus, TxStatusPacket};
