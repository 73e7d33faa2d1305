use std::future::Future;

use uuid::Uuid;

use civic_types::api::{AssignRequest, ReportScope, SendMessageRequest, TransitionRequest};
use civic_types::models::{ConversationKey, Message, Notification, Report};

use crate::error::Result;

/// REST surface the core consumes. Implementations own retry policy for the
/// reads; mutations must be attempted exactly once.
pub trait PortalApi: Send + Sync {
    fn fetch_history(
        &self,
        conversation: ConversationKey,
    ) -> impl Future<Output = Result<Vec<Message>>> + Send;

    fn send_message(
        &self,
        conversation: ConversationKey,
        req: SendMessageRequest,
    ) -> impl Future<Output = Result<Message>> + Send;

    fn fetch_notifications(&self) -> impl Future<Output = Result<Vec<Notification>>> + Send;

    fn delete_notification(&self, id: u64) -> impl Future<Output = Result<()>> + Send;

    fn mark_notification_read(&self, id: u64) -> impl Future<Output = Result<()>> + Send;

    fn fetch_reports(&self, scope: &ReportScope)
    -> impl Future<Output = Result<Vec<Report>>> + Send;

    fn fetch_report(&self, report_id: Uuid) -> impl Future<Output = Result<Report>> + Send;

    fn submit_transition(
        &self,
        report_id: Uuid,
        req: TransitionRequest,
    ) -> impl Future<Output = Result<Report>> + Send;

    fn submit_assignment(
        &self,
        report_id: Uuid,
        req: AssignRequest,
    ) -> impl Future<Output = Result<Report>> + Send;
}
