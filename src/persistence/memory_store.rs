use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::persistence::MessageStore;
use crate::persistence::entity::MessageEntity;
use crate::persistence::row::MessageRow;

/// In-process message store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<HashMap<String, MessageRow>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<String, MessageRow>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MessageStore for MemoryStore {
    fn query(&self, message_id: &str) -> Option<MessageEntity> {
        self.rows().get(message_id).cloned().map(MessageEntity::from)
    }

    fn save(&self, entity: &MessageEntity) -> bool {
        let mut rows = self.rows();
        if rows.contains_key(&entity.message_id) {
            warn!(message_id = %entity.message_id, operation = "save", "message already exists");
            return false;
        }
        rows.insert(entity.message_id.clone(), MessageRow::from(entity));
        true
    }

    fn commit(&self, message_id: &str) -> bool {
        match self.rows().get_mut(message_id) {
            Some(row) => {
                row.commit = true;
                true
            }
            None => {
                warn!(message_id, operation = "commit", "no stored message to commit");
                false
            }
        }
    }

    fn delete(&self, message_id: &str) -> bool {
        self.rows().remove(message_id);
        true
    }

    fn update_entity(&self, entity: &MessageEntity) -> bool {
        match self.rows().get_mut(&entity.message_id) {
            Some(row) => {
                row.overwrite_from(entity);
                true
            }
            None => {
                warn!(message_id = %entity.message_id, operation = "update", "no stored message to update");
                false
            }
        }
    }
}
