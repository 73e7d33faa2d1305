use std::collections::HashSet;

use chrono::{SubsecRound, Utc};
use tracing::debug;

use civic_types::api::SendMessageRequest;
use civic_types::models::{ConversationKey, Message, SenderTag};

use crate::error::ValidationError;
use crate::identity::SenderIdentity;

/// Push copies carry no stable id, so a message is identified by what it
/// says, who said it and when (to the millisecond).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    content: String,
    sender_role: SenderTag,
    created_at_ms: i64,
}

impl DedupKey {
    pub fn of(message: &Message) -> Self {
        Self {
            content: message.content.clone(),
            sender_role: message.sender_role,
            created_at_ms: message.created_at.timestamp_millis(),
        }
    }
}

/// Merge a history snapshot with live events into one ordered, duplicate-free
/// sequence. History wins when both sources hold the same logical message.
/// Equal timestamps keep their input order (history first, then live).
pub fn merge(history: Vec<Message>, live: Vec<Message>) -> Vec<Message> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Message> = history
        .into_iter()
        .chain(live)
        .filter(|m| seen.insert(DedupKey::of(m)))
        .collect();
    // sort_by_key is stable
    merged.sort_by_key(|m| m.created_at);
    merged
}

/// Result of folding one live event into a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Appended,
    Duplicate,
    /// Wrong conversation, or the stream was closed.
    Ignored,
}

/// Ordered message set for one conversation.
#[derive(Debug)]
pub struct MessageStream {
    conversation: ConversationKey,
    identity: SenderIdentity,
    display_name: String,
    messages: Vec<Message>,
    seen: HashSet<DedupKey>,
    closed: bool,
}

impl MessageStream {
    pub fn new(conversation: ConversationKey, identity: SenderIdentity, display_name: String) -> Self {
        Self {
            conversation,
            identity,
            display_name,
            messages: Vec::new(),
            seen: HashSet::new(),
            closed: false,
        }
    }

    pub fn conversation(&self) -> ConversationKey {
        self.conversation
    }

    pub fn identity(&self) -> SenderIdentity {
        self.identity
    }

    /// Unresolved identity leaves the conversation readable but not writable.
    pub fn is_read_only(&self) -> bool {
        !self.identity.is_resolved()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Fold one live event in. Ties on timestamp land after existing entries.
    pub fn accept(&mut self, message: Message) -> Accept {
        if self.closed || message.conversation != self.conversation {
            return Accept::Ignored;
        }
        if !self.seen.insert(DedupKey::of(&message)) {
            debug!("Dropping duplicate message in {}", self.conversation);
            return Accept::Duplicate;
        }
        let at = self
            .messages
            .partition_point(|m| m.created_at <= message.created_at);
        self.messages.insert(at, message);
        Accept::Appended
    }

    /// Reconcile with a fresh history snapshot. Returns false if the stream
    /// was closed and the snapshot discarded.
    pub fn apply_history(&mut self, history: Vec<Message>) -> bool {
        if self.closed {
            return false;
        }
        let history: Vec<Message> = history
            .into_iter()
            .filter(|m| m.conversation == self.conversation)
            .collect();
        let live = std::mem::take(&mut self.messages);
        self.messages = merge(history, live);
        self.seen = self.messages.iter().map(DedupKey::of).collect();
        true
    }

    /// Validate a draft and stamp it for sending.
    pub fn prepare_send(&self, draft: &str) -> Result<SendMessageRequest, ValidationError> {
        if self.closed {
            return Err(ValidationError::ConversationClosed);
        }
        let Some(sender_role) = self.identity.tag() else {
            return Err(ValidationError::IdentityUnresolved);
        };
        let content = draft.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyContent);
        }
        Ok(SendMessageRequest {
            content: content.to_string(),
            sender_role,
            sender_display_name: self.display_name.clone(),
            created_at: Utc::now().trunc_subsecs(3),
        })
    }

    /// Stop accepting events and history for good.
    pub fn close(&mut self) {
        self.closed = true;
    }
}
