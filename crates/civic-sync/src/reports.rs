use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use civic_types::api::ReportScope;
use civic_types::models::{Report, ReportStatus, Role};

use crate::api::PortalApi;
use crate::assignment::{self, AssignmentPlan, AssigneeSelection};
use crate::cache::{Mutation, QueryCache, QueryKey};
use crate::error::{ClientError, Result};
use crate::lifecycle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentOutcome {
    /// Server confirmed assignee and status together.
    Assigned(Report),
    /// Report already had an assignee; nothing was sent.
    Unchanged(Report),
}

/// Report list, status transitions and assignment against the shared cache.
pub struct ReportDesk<A> {
    api: Arc<A>,
    cache: Arc<QueryCache>,
}

impl<A: PortalApi> ReportDesk<A> {
    pub fn new(api: Arc<A>, cache: Arc<QueryCache>) -> Self {
        Self { api, cache }
    }

    pub async fn load_reports(&self, scope: &ReportScope) -> Result<Vec<Report>> {
        let reports = self.api.fetch_reports(scope).await?;
        for report in &reports {
            if let Err(violation) = report.check_invariants() {
                warn!("Report {} from server: {}", report.id, violation);
            }
        }
        self.cache.put(QueryKey::reports(scope), reports.clone());
        Ok(reports)
    }

    pub fn cached_reports(&self, scope: &ReportScope) -> Vec<Report> {
        self.cache.get(&QueryKey::reports(scope)).unwrap_or_default()
    }

    pub fn cached_report(&self, id: Uuid) -> Option<Report> {
        self.cache.get(&QueryKey::report(id))
    }

    /// Pull the server's current copy of one report into the cache.
    pub async fn refetch(&self, id: Uuid) -> Result<Report> {
        let report = self.api.fetch_report(id).await?;
        self.cache.put(QueryKey::report(id), report.clone());
        Ok(report)
    }

    /// Validate locally, then submit. A denied transition never reaches the
    /// network; a server rejection forces a refetch before it is returned.
    pub async fn transition(
        &self,
        actor: Role,
        report: &Report,
        to: ReportStatus,
        explanation: Option<&str>,
    ) -> Result<Report> {
        let req = lifecycle::validate(actor, report, to, explanation)?;
        let mutation = Mutation::Transition { report_id: report.id };

        match self.api.submit_transition(report.id, req).await {
            Ok(confirmed) => {
                if confirmed.status != to {
                    warn!(
                        "Report {} confirmed as {} after requesting {}",
                        report.id, confirmed.status, to
                    );
                }
                self.commit(&mutation, confirmed.clone());
                info!("Report {} moved {} -> {}", report.id, report.status, confirmed.status);
                Ok(confirmed)
            }
            Err(e) => Err(self.after_failure(&mutation, report.id, e).await),
        }
    }

    /// Assign and advance in one mutation. A second call on an assigned
    /// report is a no-op.
    pub async fn assign(
        &self,
        actor: Role,
        report: &Report,
        selection: &AssigneeSelection,
    ) -> Result<AssignmentOutcome> {
        let plan = assignment::plan(actor, report, selection)?;
        let AssignmentPlan::Submit(change) = plan else {
            return Ok(AssignmentOutcome::Unchanged(report.clone()));
        };
        let mutation = Mutation::AssignAndAdvance { report_id: report.id };

        match self.api.submit_assignment(report.id, change.request()).await {
            Ok(confirmed) if change.is_reflected_in(&confirmed) => {
                self.commit(&mutation, confirmed.clone());
                info!("Report {} assigned, now {}", report.id, confirmed.status);
                Ok(AssignmentOutcome::Assigned(confirmed))
            }
            Ok(confirmed) => {
                warn!(
                    "Assignment of report {} not reflected by server (status {}, assignee {:?})",
                    report.id, confirmed.status, confirmed.assignee
                );
                let err = ClientError::Rejected {
                    status: 409,
                    message: "assignment was not applied".into(),
                };
                Err(self.after_failure(&mutation, report.id, err).await)
            }
            Err(e) => Err(self.after_failure(&mutation, report.id, e).await),
        }
    }

    /// Replace the cached report with the confirmed one in a single write.
    fn commit(&self, mutation: &Mutation, confirmed: Report) {
        self.cache.invalidate_for(mutation);
        self.cache.put(QueryKey::report(confirmed.id), confirmed);
    }

    async fn after_failure(&self, mutation: &Mutation, id: Uuid, err: ClientError) -> ClientError {
        if err.requires_refetch() {
            warn!("{:?} rejected: {}; refetching report", mutation, err);
            self.cache.invalidate_for(mutation);
            if let Err(refetch) = self.refetch(id).await {
                warn!("Refetch of report {} failed: {}", id, refetch);
            }
        }
        err
    }
}
