use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AssigneeRef, ReportStatus, SenderTag};

// -- Messages --

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub content: String,
    pub sender_role: SenderTag,
    pub sender_display_name: String,
    /// Client-stamped, millisecond precision. The server echoes it back so the
    /// push copy of this message deduplicates against the local one.
    pub created_at: DateTime<Utc>,
}

// -- Reports --

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub new_status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub assignee: AssigneeRef,
}

/// Which reports the list endpoint returns for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportScope {
    /// Reports filed by the caller.
    Mine,
    /// Reports awaiting officer triage.
    Pending,
    /// Reports assigned to the caller.
    Assigned,
    /// Everything the caller's role may read.
    All,
}

impl ReportScope {
    pub fn as_query(&self) -> &'static str {
        match self {
            Self::Mine => "mine",
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::All => "all",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explanation_omitted_when_absent() {
        let req = TransitionRequest {
            new_status: ReportStatus::Resolved,
            explanation: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json, serde_json::json!({ "newStatus": "RESOLVED" }));
    }
}
