use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{ConversationKey, ConversationMode, Message, Notification, SenderTag};

/// Events delivered over the push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PushEvent {
    /// A message was posted to a report conversation
    #[serde(rename_all = "camelCase")]
    NewMessage {
        report_id: Uuid,
        mode: ConversationMode,
        content: String,
        sender_role: SenderTag,
        #[serde(default)]
        sender_display_name: Option<String>,
        created_at: DateTime<Utc>,
    },

    /// A notification was issued to the signed-in actor
    #[serde(rename_all = "camelCase")]
    NewNotification {
        id: u64,
        content: String,
        created_at: DateTime<Utc>,
    },
}

impl PushEvent {
    /// Returns the conversation if this event is scoped to one.
    /// Events that return `None` are actor-wide.
    pub fn conversation(&self) -> Option<ConversationKey> {
        match self {
            Self::NewMessage { report_id, mode, .. } => Some(ConversationKey::new(*report_id, *mode)),
            Self::NewNotification { .. } => None,
        }
    }

    /// Converts a `NewMessage` into the stored message shape.
    pub fn into_message(self) -> Option<Message> {
        match self {
            Self::NewMessage {
                report_id,
                mode,
                content,
                sender_role,
                sender_display_name,
                created_at,
            } => Some(Message {
                conversation: ConversationKey::new(report_id, mode),
                sender_role,
                sender_display_name: sender_display_name
                    .unwrap_or_else(|| sender_role.label().to_string()),
                content,
                created_at,
            }),
            Self::NewNotification { .. } => None,
        }
    }

    pub fn into_notification(self) -> Option<Notification> {
        match self {
            Self::NewNotification { id, content, created_at } => Some(Notification {
                id,
                content,
                created_at,
                is_read: false,
            }),
            Self::NewMessage { .. } => None,
        }
    }
}
