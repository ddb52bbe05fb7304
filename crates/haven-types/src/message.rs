use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

/// Delivery state of a client-originated message.
///
/// `Pending` is the only non-terminal state; a message reaches `Sent` or
/// `Failed` exactly once and never leaves it. Retrying a failed message
/// creates a new message with a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryStatus::Pending)
    }
}

/// A single message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub created_at: DateTime<Utc>,
    pub status: DeliveryStatus,
}

impl Message {
    /// A user message starts out `Pending`; delivery resolves it later.
    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            sender: Sender::User,
            created_at: Utc::now(),
            status: DeliveryStatus::Pending,
        }
    }

    /// Assistant messages only exist once delivered, so they are born `Sent`.
    pub fn assistant(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            sender: Sender::Assistant,
            created_at: Utc::now(),
            status: DeliveryStatus::Sent,
        }
    }
}
