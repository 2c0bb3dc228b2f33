use chrono::Utc;

/// Durable record of one transactionally published message.
///
/// `commit == true` makes the message visible to the delivery subsystem.
/// `deliver_count` belongs to that subsystem; nothing in this crate bumps it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessageEntity {
    pub message_id: String,
    pub topic: String,
    pub message_type: String,
    /// Protocol command type of `body` (string or bytes message).
    pub msg_type: u8,
    /// Opaque protocol header, including the transaction status.
    pub header: Vec<u8>,
    pub body: Vec<u8>,
    pub commit: bool,
    pub deliver_count: u32,
    pub publish_group: String,
    /// Unix timestamp in milliseconds; `0` means the message never expires.
    pub expired_time: i64,
    pub origin_server: String,
}

impl MessageEntity {
    /// An uncommitted message as saved when its publish transaction begins.
    pub fn new(
        message_id: impl Into<String>,
        topic: impl Into<String>,
        message_type: impl Into<String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            topic: topic.into(),
            message_type: message_type.into(),
            body,
            ..Self::default()
        }
    }

    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.expired_time > 0 && self.expired_time <= now_millis
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp_millis())
    }
}
