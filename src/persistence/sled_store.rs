//! Message store backed by `sled`
//!
//! All messages live in a single tree keyed by message id; values are
//! JSON-encoded [`MessageRow`]s. Read-modify-write operations (`commit`,
//! `update_entity`) run inside a sled transaction on that one key, which is
//! what gives a single message its atomicity.
//!
//! Configuration options supported:
//! - `path`: directory of the sled database
//! - `sync_writes`: flush to disk after every mutation instead of relying on
//!   sled's periodic background flush
//!
//! A failed flush is logged on its own and does not change the reported
//! outcome: the write is already visible to every reader at that point.

use std::path::Path;

use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
};
use sled::{Db, Tree};
use tracing::{debug, error, warn};

use crate::config::StoreSettings;
use crate::persistence::MessageStore;
use crate::persistence::entity::MessageEntity;
use crate::persistence::row::MessageRow;
use crate::utils::error::StoreError;

#[derive(Clone)]
pub struct SledStore {
    db: Db,
    pub(crate) messages: Tree,
    sync_writes: bool,
}

impl SledStore {
    /// Name of the tree holding message rows.
    pub const MESSAGES_TREE: &'static str = "kite_msg";

    /// Open or create a sled database at `path`.
    pub fn open(path: impl AsRef<Path>, sync_writes: bool) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        let messages = db.open_tree(Self::MESSAGES_TREE)?;
        Ok(Self {
            db,
            messages,
            sync_writes,
        })
    }

    pub fn from_settings(settings: &StoreSettings) -> Result<Self, StoreError> {
        Self::open(&settings.path, settings.sync_writes)
    }

    /// Number of stored messages, committed or not.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Flush every dirty buffer to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    fn flush_if_needed(&self, message_id: &str, operation: &'static str) {
        if !self.sync_writes {
            return;
        }
        if let Err(e) = self.messages.flush() {
            error!(message_id, operation, error = %e, "write applied but flush to disk failed");
        }
    }

    fn try_query(&self, message_id: &str) -> Result<Option<MessageEntity>, StoreError> {
        match self.messages.get(message_id.as_bytes())? {
            Some(raw) => Ok(Some(MessageRow::decode(&raw)?.into())),
            None => Ok(None),
        }
    }

    fn try_save(&self, entity: &MessageEntity) -> Result<(), StoreError> {
        let encoded = MessageRow::from(entity).encode()?;
        self.messages
            .compare_and_swap(
                entity.message_id.as_bytes(),
                None::<&[u8]>,
                Some(encoded),
            )?
            .map_err(|_| StoreError::Duplicate(entity.message_id.clone()))?;
        self.flush_if_needed(&entity.message_id, "save");
        Ok(())
    }

    /// `Ok(false)` when there is no row to commit.
    fn try_commit(&self, message_id: &str) -> Result<bool, StoreError> {
        let found = self
            .messages
            .transaction(|tx| -> ConflictableTransactionResult<bool, StoreError> {
                let Some(raw) = tx.get(message_id.as_bytes())? else {
                    return Ok(false);
                };
                let mut row = MessageRow::decode(&raw).map_err(ConflictableTransactionError::Abort)?;
                row.commit = true;
                let encoded = row.encode().map_err(ConflictableTransactionError::Abort)?;
                tx.insert(message_id.as_bytes(), encoded)?;
                Ok(true)
            })
            .map_err(unwrap_transaction_error)?;
        if found {
            self.flush_if_needed(message_id, "commit");
        }
        Ok(found)
    }

    fn try_delete(&self, message_id: &str) -> Result<(), StoreError> {
        if self.messages.remove(message_id.as_bytes())?.is_some() {
            self.flush_if_needed(message_id, "delete");
        }
        Ok(())
    }

    /// `Ok(false)` when there is no row to update.
    fn try_update(&self, entity: &MessageEntity) -> Result<bool, StoreError> {
        let key = entity.message_id.as_bytes();
        let found = self
            .messages
            .transaction(|tx| -> ConflictableTransactionResult<bool, StoreError> {
                let Some(raw) = tx.get(key)? else {
                    return Ok(false);
                };
                let mut row = MessageRow::decode(&raw).map_err(ConflictableTransactionError::Abort)?;
                row.overwrite_from(entity);
                let encoded = row.encode().map_err(ConflictableTransactionError::Abort)?;
                tx.insert(key, encoded)?;
                Ok(true)
            })
            .map_err(unwrap_transaction_error)?;
        if found {
            self.flush_if_needed(&entity.message_id, "update");
        }
        Ok(found)
    }
}

fn unwrap_transaction_error(err: TransactionError<StoreError>) -> StoreError {
    match err {
        TransactionError::Abort(inner) => inner,
        TransactionError::Storage(inner) => StoreError::Sled(inner),
    }
}

impl MessageStore for SledStore {
    fn query(&self, message_id: &str) -> Option<MessageEntity> {
        match self.try_query(message_id) {
            Ok(entity) => entity,
            Err(e) => {
                error!(message_id, operation = "query", error = %e, "failed to read message");
                None
            }
        }
    }

    fn save(&self, entity: &MessageEntity) -> bool {
        match self.try_save(entity) {
            Ok(()) => {
                debug!(message_id = %entity.message_id, topic = %entity.topic, "message saved");
                true
            }
            Err(e) => {
                error!(message_id = %entity.message_id, operation = "save", error = %e, "failed to save message");
                false
            }
        }
    }

    fn commit(&self, message_id: &str) -> bool {
        match self.try_commit(message_id) {
            Ok(true) => true,
            Ok(false) => {
                warn!(message_id, operation = "commit", "no stored message to commit");
                false
            }
            Err(e) => {
                error!(message_id, operation = "commit", error = %e, "failed to commit message");
                false
            }
        }
    }

    fn delete(&self, message_id: &str) -> bool {
        match self.try_delete(message_id) {
            Ok(()) => true,
            Err(e) => {
                error!(message_id, operation = "delete", error = %e, "failed to delete message");
                false
            }
        }
    }

    fn update_entity(&self, entity: &MessageEntity) -> bool {
        match self.try_update(entity) {
            Ok(true) => true,
            Ok(false) => {
                warn!(message_id = %entity.message_id, operation = "update", "no stored message to update");
                false
            }
            Err(e) => {
                error!(message_id = %entity.message_id, operation = "update", error = %e, "failed to update message");
                false
            }
        }
    }
}

impl std::fmt::Debug for SledStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledStore")
            .field("db", &"sled::Db")
            .field("sync_writes", &self.sync_writes)
            .finish()
    }
}
