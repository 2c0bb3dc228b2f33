//! # txack
//!
//! `txack` is the transactional acknowledgement core of a message broker. It
//! decides, for every transactionally published message, whether the message
//! becomes durably committed and eligible for delivery or is discarded: a
//! message is never handed to delivery unless its commit is durable, and a
//! rolled-back message is removed outright.
//!
//! ## Core Modules
//!
//! - `pipeline`: the event model and the ordered handler chain events travel through.
//! - `handler`: the transactional-ack handler and the delivery hand-off.
//! - `persistence`: the message-store contract and its `sled` and in-memory backends.
//! - `protocol`: the transaction-status packet the transport layer produces.
//! - `worker`: runs one pipeline traversal per inbound event with bounded concurrency.
//! - `config`: loads settings from files and the environment.
//! - `utils`: error types and logging setup.

pub mod config;
pub mod handler;
pub mod persistence;
pub mod pipeline;
pub mod protocol;
pub mod utils;
pub mod worker;
