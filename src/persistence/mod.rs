//! The `persistence` module defines the durable-store contract the
//! transactional-ack core depends on, plus the backends that satisfy it.
//!
//! - `entity`: the [`MessageEntity`] record.
//! - `row`: the explicit column mapping backends persist.
//! - `sled_store`: durable backend on an embedded `sled` database.
//! - `memory_store`: process-local backend, handy for tests and tooling.
//!
//! Contract operations report success as a `bool`. Backends log the
//! underlying [`StoreError`](crate::utils::error::StoreError) themselves and
//! never panic or propagate it, so callers only ever branch on the outcome.

pub mod entity;
pub mod memory_store;
pub mod row;
pub mod sled_store;

pub use entity::MessageEntity;
pub use memory_store::MemoryStore;
pub use sled_store::SledStore;

/// Durable storage for transactional messages, keyed by message id.
///
/// Implementations must be safe to call concurrently for distinct ids.
/// Atomicity for a single id comes from the backend's single-row writes;
/// callers guarantee at most one outstanding ack per id.
pub trait MessageStore: Send + Sync {
    /// Current record for `message_id`, or `None` when no row exists.
    fn query(&self, message_id: &str) -> Option<MessageEntity>;

    /// Insert a new record. `false` on duplicate id or I/O failure.
    fn save(&self, entity: &MessageEntity) -> bool;

    /// Mark the record committed. Unconditional, so repeating it is safe.
    /// `false` when the row does not exist or the write fails.
    fn commit(&self, message_id: &str) -> bool;

    /// Remove the record. Removing a missing row succeeds.
    fn delete(&self, message_id: &str) -> bool;

    /// Discard an uncommitted message.
    ///
    /// This deletes the row whatever its commit flag says; the store does not
    /// guard against rolling back a message that was already committed.
    fn rollback(&self, message_id: &str) -> bool {
        self.delete(message_id)
    }

    /// Overwrite topic, message type, expiry, commit flag and body of an
    /// existing record. `false` when the row does not exist.
    fn update_entity(&self, entity: &MessageEntity) -> bool;
}
