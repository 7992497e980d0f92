use chrono::{DateTime, Utc};
use serde::Serialize;

use openweed_core::{ChatMessageId, MessageType, UserId};

#[derive(Debug, Clone, Serialize)]
pub struct ChatAuthor {
    pub name: String,
}

/// A lounge message with its author's display name.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub user_id: UserId,
    pub room: String,
    pub message: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
    pub user: ChatAuthor,
}
