use serde::{Deserialize, Serialize};

/// Routing metadata carried by every transaction-status packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxHeader {
    pub message_id: String,
    pub topic: String,
    pub message_type: String,
}

/// Outcome a publisher reports for a previously published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Unknown,
    Commit,
    Rollback,
}

impl TxStatus {
    pub const UNKNOWN_CODE: i32 = 0;
    pub const COMMIT_CODE: i32 = 1;
    pub const ROLLBACK_CODE: i32 = 2;

    /// Maps the protocol's numeric status. Unrecognized codes are `Unknown`.
    pub fn from_code(code: i32) -> Self {
        match code {
            Self::COMMIT_CODE => TxStatus::Commit,
            Self::ROLLBACK_CODE => TxStatus::Rollback,
            _ => TxStatus::Unknown,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            TxStatus::Unknown => Self::UNKNOWN_CODE,
            TxStatus::Commit => Self::COMMIT_CODE,
            TxStatus::Rollback => Self::ROLLBACK_CODE,
        }
    }
}

/// A decoded transaction ack. Consumed exactly once by the tx-ack handler.
///
/// `feedback` is free-form diagnostic text from the publisher and is only
/// ever logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatusPacket {
    pub header: TxHeader,
    pub status: TxStatus,
    #[serde(default)]
    pub feedback: Option<String>,
}

impl TxStatusPacket {
    pub fn new(header: TxHeader, status: TxStatus) -> Self {
        Self {
            header,
            status,
            feedback: None,
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    pub fn message_id(&self) -> &str {
        &self.header.message_id
    }
}
