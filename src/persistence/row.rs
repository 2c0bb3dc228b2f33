//! Column layout of a persisted message.
//!
//! [`MessageRow`] mirrors the `kite_msg`-style table every backend stores:
//! one row per message id. The conversion to and from [`MessageEntity`] is
//! spelled out field by field so the stored layout never changes by
//! accident when the entity grows.

use serde::{Deserialize, Serialize};

use crate::persistence::entity::MessageEntity;
use crate::utils::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRow {
    #[serde(rename = "messageId")]
    pub message_id: String,
    pub topic: String,
    #[serde(rename = "messageType")]
    pub message_type: String,
    #[serde(rename = "msgType")]
    pub msg_type: u8,
    #[serde(rename = "expiredTime")]
    pub expired_time: i64,
    #[serde(rename = "deliverCount")]
    pub deliver_count: u32,
    #[serde(rename = "publishGroup")]
    pub publish_group: String,
    pub commit: bool,
    pub header: Vec<u8>,
    pub body: Vec<u8>,
    #[serde(rename = "originServer")]
    pub origin_server: String,
}

impl From<&MessageEntity> for MessageRow {
    fn from(entity: &MessageEntity) -> Self {
        Self {
            message_id: entity.message_id.clone(),
            topic: entity.topic.clone(),
            message_type: entity.message_type.clone(),
            msg_type: entity.msg_type,
            expired_time: entity.expired_time,
            deliver_count: entity.deliver_count,
            publish_group: entity.publish_group.clone(),
            commit: entity.commit,
            header: entity.header.clone(),
            body: entity.body.clone(),
            origin_server: entity.origin_server.clone(),
        }
    }
}

impl From<MessageRow> for MessageEntity {
    fn from(row: MessageRow) -> Self {
        Self {
            message_id: row.message_id,
            topic: row.topic,
            message_type: row.message_type,
            msg_type: row.msg_type,
            header: row.header,
            body: row.body,
            commit: row.commit,
            deliver_count: row.deliver_count,
            publish_group: row.publish_group,
            expired_time: row.expired_time,
            origin_server: row.origin_server,
        }
    }
}

impl MessageRow {
    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Apply the fields `update_entity` is allowed to overwrite.
    pub fn overwrite_from(&mut self, entity: &MessageEntity) {
        self.topic = entity.topic.clone();
        self.message_type = entity.message_type.clone();
        self.expired_time = entity.expired_time;
        self.commit = entity.commit;
        self.body = entity.body.clone();
    }
}
