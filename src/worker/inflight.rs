use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Message ids whose ack is currently inside the pipeline.
#[derive(Debug, Clone, Default)]
pub struct InflightAcks {
    ids: Arc<Mutex<HashSet<String>>>,
}

impl InflightAcks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `message_id`. Returns `None` if another ack for it is in flight.
    /// The claim is released when the guard drops.
    pub fn try_acquire(&self, message_id: &str) -> Option<InflightGuard> {
        if !self.ids().insert(message_id.to_string()) {
            return None;
        }
        Some(InflightGuard {
            owner: self.clone(),
            message_id: message_id.to_string(),
        })
    }

    pub fn contains(&self, message_id: &str) -> bool {
        self.ids().contains(message_id)
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    fn ids(&self) -> MutexGuard<'_, HashSet<String>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub struct InflightGuard {
    owner: InflightAcks,
    message_id: String,
}

impl InflightGuard {
    pub fn message_id(&self) -> &str {
        &self.message_id
    }
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        self.owner.ids().remove(&self.message_id);
    }
}
