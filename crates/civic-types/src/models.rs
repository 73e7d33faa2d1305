use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Roles --

/// Role of the acting user. Drives transition permissions and sender identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Officer,
    Admin,
    Agent,
    Lead,
    External,
}

impl Role {
    /// Parse a wire role name. Unknown names are treated as a missing role.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "USER" => Some(Self::User),
            "OFFICER" => Some(Self::Officer),
            "ADMIN" => Some(Self::Admin),
            "AGENT" => Some(Self::Agent),
            "LEAD" => Some(Self::Lead),
            "EXTERNAL" => Some(Self::External),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "USER",
            Self::Officer => "OFFICER",
            Self::Admin => "ADMIN",
            Self::Agent => "AGENT",
            Self::Lead => "LEAD",
            Self::External => "EXTERNAL",
        };
        f.write_str(name)
    }
}

/// Resolved speaker label attached to a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SenderTag {
    User,
    Officer,
    Lead,
    External,
}

impl SenderTag {
    /// Fallback display name when a message carries none.
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "Citizen",
            Self::Officer => "Municipal officer",
            Self::Lead => "Tech lead",
            Self::External => "External maintainer",
        }
    }
}

// -- Conversations --

/// Which pair of roles may speak in a chat channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConversationMode {
    OfficerUser,
    LeadExternal,
}

impl ConversationMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OFFICER_USER" => Some(Self::OfficerUser),
            "LEAD_EXTERNAL" => Some(Self::LeadExternal),
            _ => None,
        }
    }

    /// Path segment used by the REST routes.
    pub fn as_path(self) -> &'static str {
        match self {
            Self::OfficerUser => "officer-user",
            Self::LeadExternal => "lead-external",
        }
    }
}

/// A report owns at most one conversation per mode, so the pair is the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationKey {
    pub report_id: Uuid,
    pub mode: ConversationMode,
}

impl ConversationKey {
    pub fn new(report_id: Uuid, mode: ConversationMode) -> Self {
        Self { report_id, mode }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.report_id, self.mode.as_path())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub conversation: ConversationKey,
    pub sender_role: SenderTag,
    pub sender_display_name: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

// -- Notifications --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_read: bool,
}

// -- Reports --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    PendingApproval,
    Assigned,
    InProgress,
    Suspended,
    Resolved,
    Rejected,
}

impl ReportStatus {
    /// Statuses in which a report may carry an assignee.
    pub fn admits_assignee(self) -> bool {
        matches!(
            self,
            Self::Assigned | Self::InProgress | Self::Suspended | Self::Resolved
        )
    }

    /// No role-driven transition leaves these.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PendingApproval => "Pending Approval",
            Self::Assigned => "Assigned",
            Self::InProgress => "In Progress",
            Self::Suspended => "Suspended",
            Self::Resolved => "Resolved",
            Self::Rejected => "Rejected",
        };
        f.write_str(name)
    }
}

/// Who a report is assigned to. An internal officer and an external
/// maintainer are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "camelCase")]
pub enum AssigneeRef {
    Officer(Uuid),
    Maintainer(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub reporter_id: Uuid,
    pub status: ReportStatus,
    #[serde(default)]
    pub assignee: Option<AssigneeRef>,
    #[serde(default)]
    pub rejection_explanation: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// Returns the first violated data-model invariant, if any.
    pub fn check_invariants(&self) -> Result<(), &'static str> {
        if self.assignee.is_some() && !self.status.admits_assignee() {
            return Err("assignee set outside an assigned status");
        }
        let has_explanation = self
            .rejection_explanation
            .as_deref()
            .is_some_and(|e| !e.trim().is_empty());
        match (self.status, has_explanation) {
            (ReportStatus::Rejected, false) => Err("rejected report without explanation"),
            (status, true) if status != ReportStatus::Rejected => {
                Err("rejection explanation on a non-rejected report")
            }
            _ => Ok(()),
        }
    }
}

// -- Session --

/// Profile of the signed-in actor. Bootstrapped externally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub actor_id: Uuid,
    pub role: Role,
    pub display_name: String,
}
