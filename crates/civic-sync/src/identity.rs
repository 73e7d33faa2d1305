use civic_types::models::{ConversationMode, Role, SenderTag};

/// Outcome of resolving who is speaking in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenderIdentity {
    Resolved(SenderTag),
    /// No tag for this (mode, role); the conversation is read-only.
    Unresolved,
}

impl SenderIdentity {
    pub fn tag(self) -> Option<SenderTag> {
        match self {
            Self::Resolved(tag) => Some(tag),
            Self::Unresolved => None,
        }
    }

    pub fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// Maps a conversation mode and the actor's role to the sender tag used for
/// outgoing messages.
pub fn resolve(mode: Option<ConversationMode>, role: Option<Role>) -> SenderIdentity {
    let (Some(mode), Some(role)) = (mode, role) else {
        return SenderIdentity::Unresolved;
    };

    let tag = match (mode, role) {
        (ConversationMode::LeadExternal, Role::Lead) => SenderTag::Lead,
        (ConversationMode::LeadExternal, _) => SenderTag::External,
        (ConversationMode::OfficerUser, Role::Agent) => SenderTag::Officer,
        (ConversationMode::OfficerUser, Role::Lead) => SenderTag::Lead,
        (ConversationMode::OfficerUser, Role::User) => SenderTag::User,
        (ConversationMode::OfficerUser, _) => return SenderIdentity::Unresolved,
    };
    SenderIdentity::Resolved(tag)
}

/// Display name for an outgoing message: the actor's own name when known,
/// otherwise the tag's label.
pub fn display_name(tag: SenderTag, profile_name: Option<&str>) -> String {
    match profile_name.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => tag.label().to_string(),
    }
}
