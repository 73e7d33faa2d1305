use uuid::Uuid;

use civic_types::api::AssignRequest;
use civic_types::models::{AssigneeRef, Report, ReportStatus, Role};

use crate::error::ValidationError;

/// Assignee picker state. Officer and maintainer are mutually exclusive:
/// choosing one clears the other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssigneeSelection {
    officer: Option<Uuid>,
    maintainer: Option<Uuid>,
}

impl AssigneeSelection {
    pub fn select_officer(&mut self, id: Uuid) {
        self.officer = Some(id);
        self.maintainer = None;
    }

    pub fn select_maintainer(&mut self, id: Uuid) {
        self.maintainer = Some(id);
        self.officer = None;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn officer(&self) -> Option<Uuid> {
        self.officer
    }

    pub fn maintainer(&self) -> Option<Uuid> {
        self.maintainer
    }

    pub fn to_ref(&self) -> Option<AssigneeRef> {
        match (self.officer, self.maintainer) {
            (Some(id), None) => Some(AssigneeRef::Officer(id)),
            (None, Some(id)) => Some(AssigneeRef::Maintainer(id)),
            _ => None,
        }
    }
}

/// Sets the assignee and moves the report out of PendingApproval in one
/// server call, with one outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignAndAdvance {
    pub report_id: Uuid,
    pub assignee: AssigneeRef,
}

impl AssignAndAdvance {
    pub fn request(&self) -> AssignRequest {
        AssignRequest {
            assignee: self.assignee,
        }
    }

    /// Whether a confirmed report shows both halves of the change.
    pub fn is_reflected_in(&self, confirmed: &Report) -> bool {
        confirmed.id == self.report_id
            && confirmed.assignee == Some(self.assignee)
            && confirmed.status != ReportStatus::PendingApproval
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentPlan {
    /// The report already has an assignee; nothing to send.
    AlreadyAssigned,
    Submit(AssignAndAdvance),
}

pub fn can_assign(role: Role) -> bool {
    matches!(role, Role::Officer | Role::Admin | Role::Lead)
}

/// Decide what an assign action should do. Once a report has an assignee the
/// action is a no-op; reassignment has no path here.
pub fn plan(
    role: Role,
    report: &Report,
    selection: &AssigneeSelection,
) -> Result<AssignmentPlan, ValidationError> {
    if report.assignee.is_some() {
        return Ok(AssignmentPlan::AlreadyAssigned);
    }

    let status = report.status;
    let open = matches!(status, ReportStatus::PendingApproval | ReportStatus::Assigned);
    if !can_assign(role) || !open {
        return Err(ValidationError::AssignmentDenied { role, status });
    }

    let assignee = selection.to_ref().ok_or(ValidationError::NoAssignee)?;
    Ok(AssignmentPlan::Submit(AssignAndAdvance {
        report_id: report.id,
        assignee,
    }))
}
