use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::role::Capability;
use crate::workflow::error::LeaveError;
use crate::workflow::state::{Caller, DecisionAction, SubmitLeave, plan_decision};
use crate::workflow::store::{ApplyOutcome, LeavePage, LeaveQuery, LeaveScope, LeaveStore};

pub const DEFAULT_PER_PAGE: u64 = 10;
pub const MAX_PER_PAGE: u64 = 100;

/// Entry point for everything that reads or changes leave requests.
#[derive(Clone)]
pub struct LeaveWorkflow {
    store: Arc<dyn LeaveStore>,
}

impl LeaveWorkflow {
    pub fn new(store: Arc<dyn LeaveStore>) -> Self {
        Self { store }
    }

    #[instrument(name = "leave_submit", skip(self, input), fields(requester_id = caller.id))]
    pub async fn submit(&self, caller: Caller, input: SubmitLeave) -> Result<LeaveRequest, LeaveError> {
        if !caller.role.can(Capability::SubmitLeave) {
            return Err(LeaveError::Forbidden("submit leave requests"));
        }

        let new = input.validate(caller.id)?;
        let created = self.store.insert(new).await?;

        info!(leave_id = created.id, leave_type = %created.leave_type, "Leave request submitted");
        Ok(created)
    }

    #[instrument(name = "leave_decide", skip(self), fields(approver_id = caller.id, role = %caller.role))]
    pub async fn decide(
        &self,
        caller: Caller,
        id: u64,
        action: DecisionAction,
    ) -> Result<LeaveRequest, LeaveError> {
        let request = self.store.find(id).await?.ok_or(LeaveError::NotFound)?;
        let transition = plan_decision(&request, caller, action, Utc::now())?;

        match self.store.apply(id, &transition).await? {
            ApplyOutcome::Applied(updated) => {
                info!(
                    status = %updated.status,
                    debited_days = transition.debit.as_ref().map(|d| d.days),
                    "Leave decision recorded"
                );
                Ok(updated)
            }
            ApplyOutcome::Stale => {
                warn!("Leave request changed while deciding");
                Err(LeaveError::Conflict(
                    "Leave request was decided concurrently".into(),
                ))
            }
            ApplyOutcome::InsufficientBalance => {
                info!(requested = request.span_days(), "Leave approval blocked by balance");
                Err(LeaveError::insufficient_balance(
                    request.leave_type,
                    request.span_days(),
                ))
            }
        }
    }

    pub async fn get(&self, caller: Caller, id: u64) -> Result<LeaveRequest, LeaveError> {
        let request = self.store.find(id).await?.ok_or(LeaveError::NotFound)?;

        if request.requester_id != caller.id && scope_for(caller) == LeaveScope::RequestedBy(caller.id) {
            return Err(LeaveError::Forbidden("view this leave request"));
        }
        Ok(request)
    }

    pub async fn list(
        &self,
        caller: Caller,
        status: Option<LeaveStatus>,
        page: Option<u64>,
        per_page: Option<u64>,
    ) -> Result<(LeavePage, LeaveQuery), LeaveError> {
        let query = LeaveQuery {
            scope: scope_for(caller),
            status,
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE),
        };

        let page = self.store.list(&query).await?;
        Ok((page, query))
    }
}

/// Visibility rule for listings: reviewers see their queue, admins see
/// everything, everyone else sees their own requests.
pub fn scope_for(caller: Caller) -> LeaveScope {
    let role = caller.role;
    if role.can(Capability::ReviewAsSupervisor) {
        LeaveScope::AwaitingSupervisor
    } else if role.can(Capability::ReviewAsDirection) {
        LeaveScope::AwaitingDirection
    } else if role.can(Capability::ViewAllLeave) {
        LeaveScope::All
    } else {
        LeaveScope::RequestedBy(caller.id)
    }
}
