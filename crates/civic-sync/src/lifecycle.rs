use civic_types::api::TransitionRequest;
use civic_types::models::{Report, ReportStatus, Role};

use crate::error::ValidationError;

pub const ALL_STATUSES: [ReportStatus; 6] = [
    ReportStatus::PendingApproval,
    ReportStatus::Assigned,
    ReportStatus::InProgress,
    ReportStatus::Suspended,
    ReportStatus::Resolved,
    ReportStatus::Rejected,
];

/// The role-gated transition table.
///
/// Officers and admins triage pending reports (assign or reject). Agents and
/// leads move assigned work between in-progress, suspended and resolved.
pub fn is_allowed(role: Role, from: ReportStatus, to: ReportStatus) -> bool {
    use ReportStatus::*;

    match role {
        Role::Officer | Role::Admin => from == PendingApproval && matches!(to, Assigned | Rejected),
        Role::Agent | Role::Lead => {
            matches!(from, Assigned | InProgress | Suspended)
                && matches!(to, InProgress | Suspended | Resolved)
                && from != to
        }
        Role::User | Role::External => false,
    }
}

/// Targets `role` may pick from `from`, in lifecycle order.
pub fn available_transitions(role: Role, from: ReportStatus) -> Vec<ReportStatus> {
    ALL_STATUSES
        .into_iter()
        .filter(|&to| is_allowed(role, from, to))
        .collect()
}

/// Check a transition locally and build the request to send.
///
/// An explanation is carried only when rejecting, and must be non-blank.
pub fn validate(
    role: Role,
    report: &Report,
    to: ReportStatus,
    explanation: Option<&str>,
) -> Result<TransitionRequest, ValidationError> {
    let from = report.status;
    if !is_allowed(role, from, to) {
        return Err(ValidationError::TransitionDenied { role, from, to });
    }

    let explanation = match to {
        ReportStatus::Rejected => {
            let text = explanation.map(str::trim).unwrap_or_default();
            if text.is_empty() {
                return Err(ValidationError::EmptyExplanation);
            }
            Some(text.to_string())
        }
        _ => None,
    };

    Ok(TransitionRequest {
        new_status: to,
        explanation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::report;

    #[test]
    fn officer_triage() {
        assert_eq!(
            available_transitions(Role::Officer, ReportStatus::PendingApproval),
            vec![ReportStatus::Assigned, ReportStatus::Rejected]
        );
        assert!(available_transitions(Role::Admin, ReportStatus::Assigned).is_empty());
    }

    #[test]
    fn agent_work_states() {
        assert_eq!(
            available_transitions(Role::Agent, ReportStatus::InProgress),
            vec![ReportStatus::Suspended, ReportStatus::Resolved]
        );
        assert!(available_transitions(Role::Lead, ReportStatus::PendingApproval).is_empty());
        assert!(available_transitions(Role::Lead, ReportStatus::Resolved).is_empty());
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for role in [Role::User, Role::Officer, Role::Admin, Role::Agent, Role::Lead, Role::External] {
            for from in ALL_STATUSES.into_iter().filter(|s| s.is_terminal()) {
                assert!(available_transitions(role, from).is_empty());
            }
        }
    }

    #[test]
    fn agent_cannot_resolve_pending_report() {
        let r = report(ReportStatus::PendingApproval);
        assert_eq!(
            validate(Role::Agent, &r, ReportStatus::Resolved, None),
            Err(ValidationError::TransitionDenied {
                role: Role::Agent,
                from: ReportStatus::PendingApproval,
                to: ReportStatus::Resolved,
            })
        );
    }

    #[test]
    fn reject_requires_explanation() {
        let r = report(ReportStatus::PendingApproval);
        for blank in [None, Some(""), Some("   ")] {
            assert_eq!(
                validate(Role::Officer, &r, ReportStatus::Rejected, blank),
                Err(ValidationError::EmptyExplanation)
            );
        }

        let req = validate(Role::Officer, &r, ReportStatus::Rejected, Some("blocked")).unwrap();
        assert_eq!(req.explanation.as_deref(), Some("blocked"));
    }

    #[test]
    fn explanation_dropped_for_other_targets() {
        let r = report(ReportStatus::InProgress);
        let req = validate(Role::Lead, &r, ReportStatus::Resolved, Some("fixed")).unwrap();
        assert_eq!(req.new_status, ReportStatus::Resolved);
        assert!(req.explanation.is_none());
    }

    #[test]
    fn same_state_is_not_a_transition() {
        let r = report(ReportStatus::Suspended);
        assert!(validate(Role::Agent, &r, ReportStatus::Suspended, None).is_err());
    }
}
