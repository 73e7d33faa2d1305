//! In-memory `PortalApi` that behaves like a cooperative server and records
//! every request it receives.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use civic_types::api::{AssignRequest, ReportScope, SendMessageRequest, TransitionRequest};
use civic_types::models::{ConversationKey, Message, Notification, Report, ReportStatus};

use crate::api::PortalApi;
use crate::error::{ClientError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    FetchHistory(ConversationKey),
    SendMessage(ConversationKey, String),
    FetchNotifications,
    DeleteNotification(u64),
    MarkRead(u64),
    FetchReports(ReportScope),
    FetchReport(Uuid),
    Transition(Uuid, TransitionRequest),
    Assign(Uuid, AssignRequest),
}

#[derive(Default)]
pub struct FakeState {
    pub calls: Vec<Call>,
    pub history: HashMap<ConversationKey, Vec<Message>>,
    pub notifications: Vec<Notification>,
    pub reports: HashMap<Uuid, Report>,
    /// Deletes of these ids are refused by the server.
    pub refuse_deletes: HashSet<u64>,
    /// Every report mutation is refused as stale.
    pub refuse_report_mutations: bool,
    /// Server answers assignments without recording the assignee.
    pub drop_assignee: bool,
    pub offline: bool,
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    fn record(&self, call: Call) -> MutexGuard<'_, FakeState> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }
}

fn offline() -> ClientError {
    ClientError::transport("connection refused")
}

fn stale() -> ClientError {
    ClientError::Rejected {
        status: 409,
        message: "report state changed".into(),
    }
}

pub fn report(status: ReportStatus) -> Report {
    Report {
        id: Uuid::new_v4(),
        title: "Overflowing bin on Elm St".into(),
        description: "Has not been emptied for two weeks".into(),
        category: Some("sanitation".into()),
        reporter_id: Uuid::new_v4(),
        status,
        assignee: None,
        rejection_explanation: None,
        created_at: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
    }
}

pub fn notification(id: u64) -> Notification {
    Notification {
        id,
        content: format!("notification {id}"),
        created_at: Utc.timestamp_millis_opt(1_700_000_000_000 + id as i64).unwrap(),
        is_read: false,
    }
}

impl PortalApi for FakeApi {
    async fn fetch_history(&self, conversation: ConversationKey) -> Result<Vec<Message>> {
        let state = self.record(Call::FetchHistory(conversation));
        if state.offline {
            return Err(offline());
        }
        Ok(state.history.get(&conversation).cloned().unwrap_or_default())
    }

    async fn send_message(&self, conversation: ConversationKey, req: SendMessageRequest) -> Result<Message> {
        let mut state = self.record(Call::SendMessage(conversation, req.content.clone()));
        if state.offline {
            return Err(offline());
        }
        let message = Message {
            conversation,
            sender_role: req.sender_role,
            sender_display_name: req.sender_display_name,
            content: req.content,
            created_at: req.created_at,
        };
        state.history.entry(conversation).or_default().push(message.clone());
        Ok(message)
    }

    async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
        let state = self.record(Call::FetchNotifications);
        if state.offline {
            return Err(offline());
        }
        Ok(state.notifications.clone())
    }

    async fn delete_notification(&self, id: u64) -> Result<()> {
        let mut state = self.record(Call::DeleteNotification(id));
        if state.offline {
            return Err(offline());
        }
        if state.refuse_deletes.contains(&id) {
            return Err(ClientError::Rejected {
                status: 403,
                message: "not allowed".into(),
            });
        }
        state.notifications.retain(|n| n.id != id);
        Ok(())
    }

    async fn mark_notification_read(&self, id: u64) -> Result<()> {
        let mut state = self.record(Call::MarkRead(id));
        if state.offline {
            return Err(offline());
        }
        for n in state.notifications.iter_mut().filter(|n| n.id == id) {
            n.is_read = true;
        }
        Ok(())
    }

    async fn fetch_reports(&self, scope: &ReportScope) -> Result<Vec<Report>> {
        let state = self.record(Call::FetchReports(scope.clone()));
        if state.offline {
            return Err(offline());
        }
        let mut reports: Vec<Report> = state.reports.values().cloned().collect();
        reports.sort_by_key(|r| r.created_at);
        Ok(reports)
    }

    async fn fetch_report(&self, report_id: Uuid) -> Result<Report> {
        let state = self.record(Call::FetchReport(report_id));
        if state.offline {
            return Err(offline());
        }
        state.reports.get(&report_id).cloned().ok_or(ClientError::Rejected {
            status: 404,
            message: "no such report".into(),
        })
    }

    async fn submit_transition(&self, report_id: Uuid, req: TransitionRequest) -> Result<Report> {
        let mut state = self.record(Call::Transition(report_id, req.clone()));
        if state.offline {
            return Err(offline());
        }
        if state.refuse_report_mutations {
            return Err(stale());
        }
        let report = state.reports.get_mut(&report_id).ok_or_else(stale)?;
        report.status = req.new_status;
        if req.new_status == ReportStatus::Rejected {
            report.rejection_explanation = req.explanation;
        }
        Ok(report.clone())
    }

    async fn submit_assignment(&self, report_id: Uuid, req: AssignRequest) -> Result<Report> {
        let mut state = self.record(Call::Assign(report_id, req.clone()));
        if state.offline {
            return Err(offline());
        }
        if state.refuse_report_mutations {
            return Err(stale());
        }
        let drop_assignee = state.drop_assignee;
        let report = state.reports.get_mut(&report_id).ok_or_else(stale)?;
        if !drop_assignee {
            report.assignee = Some(req.assignee);
        }
        if report.status == ReportStatus::PendingApproval {
            report.status = ReportStatus::Assigned;
        }
        Ok(report.clone())
    }
}
