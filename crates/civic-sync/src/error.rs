use civic_types::models::{ReportStatus, Role};
use thiserror::Error;

/// Failures detected before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{role} may not move a report from {from} to {to}")]
    TransitionDenied {
        role: Role,
        from: ReportStatus,
        to: ReportStatus,
    },

    #[error("rejecting a report requires an explanation")]
    EmptyExplanation,

    #[error("message content is empty")]
    EmptyContent,

    #[error("sender identity could not be established; conversation is read-only")]
    IdentityUnresolved,

    #[error("{role} may not assign a report in status {status}")]
    AssignmentDenied { role: Role, status: ReportStatus },

    #[error("no assignee selected")]
    NoAssignee,

    #[error("conversation view has been closed")]
    ConversationClosed,
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// Local validation failure; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Network or push failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server received the mutation and refused it.
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ClientError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    /// True when the failure never left the client.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// A server rejection means the local view may be stale.
    pub fn requires_refetch(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_names_role_and_states() {
        let err = ValidationError::TransitionDenied {
            role: Role::Agent,
            from: ReportStatus::PendingApproval,
            to: ReportStatus::Resolved,
        };
        assert_eq!(
            err.to_string(),
            "AGENT may not move a report from Pending Approval to Resolved"
        );
    }

    #[test]
    fn classification() {
        let local: ClientError = ValidationError::EmptyContent.into();
        assert!(local.is_local());
        assert!(!local.requires_refetch());

        let rejected = ClientError::Rejected {
            status: 409,
            message: "stale".into(),
        };
        assert!(rejected.requires_refetch());
        assert!(!ClientError::transport("reset").requires_refetch());
    }
}
