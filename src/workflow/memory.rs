//! In-process `LeaveStore` used by the workflow and HTTP tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::model::leave_request::{
    ApprovalTier, LeaveRequest, LeaveStatus, LeaveType, NewLeaveRequest,
};
use crate::workflow::state::Transition;
use crate::workflow::store::{ApplyOutcome, LeavePage, LeaveQuery, LeaveScope, LeaveStore};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Balances {
    pub vacation: u32,
    pub administrative: u32,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    requests: BTreeMap<u64, LeaveRequest>,
    balances: HashMap<u64, Balances>,
}

#[derive(Default)]
pub struct InMemoryLeaveStore {
    inner: Mutex<Inner>,
}

impl InMemoryLeaveStore {
    pub fn with_user(self, user_id: u64, balances: Balances) -> Self {
        self.inner.lock().unwrap().balances.insert(user_id, balances);
        self
    }

    pub fn balances(&self, user_id: u64) -> Balances {
        self.inner
            .lock()
            .unwrap()
            .balances
            .get(&user_id)
            .copied()
            .unwrap_or_default()
    }
}

fn in_scope(request: &LeaveRequest, scope: LeaveScope) -> bool {
    match scope {
        LeaveScope::RequestedBy(id) => request.requester_id == id,
        LeaveScope::AwaitingSupervisor => request.supervisor_approver_id.is_none(),
        LeaveScope::AwaitingDirection => {
            request.supervisor_approver_id.is_some() && request.direction_approver_id.is_none()
        }
        LeaveScope::All => true,
    }
}

#[async_trait]
impl LeaveStore for InMemoryLeaveStore {
    async fn insert(&self, new: NewLeaveRequest) -> Result<LeaveRequest, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let request = LeaveRequest {
            id: inner.next_id,
            leave_type: new.leave_type,
            reason: new.reason,
            start_date: new.start_date,
            end_date: new.end_date,
            requester_id: new.requester_id,
            status: LeaveStatus::Pending,
            supervisor_approver_id: None,
            supervisor_approved_at: None,
            direction_approver_id: None,
            direction_approved_at: None,
            created_at: Utc::now(),
        };
        inner.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn find(&self, id: u64) -> Result<Option<LeaveRequest>, sqlx::Error> {
        let found = self.inner.lock().unwrap().requests.get(&id).cloned();
        // Suspend after the read, like a round trip to the database, so
        // concurrent callers can interleave between `find` and `apply`.
        actix_web::rt::task::yield_now().await;
        Ok(found)
    }

    async fn list(&self, query: &LeaveQuery) -> Result<LeavePage, sqlx::Error> {
        let inner = self.inner.lock().unwrap();
        let matching: Vec<&LeaveRequest> = inner
            .requests
            .values()
            .rev()
            .filter(|r| in_scope(r, query.scope))
            .filter(|r| query.status.is_none_or(|s| r.status == s))
            .collect();

        let data = matching
            .iter()
            .skip(query.offset() as usize)
            .take(query.per_page as usize)
            .map(|r| (*r).clone())
            .collect();

        Ok(LeavePage {
            data,
            total: matching.len() as i64,
        })
    }

    async fn apply(&self, id: u64, transition: &Transition) -> Result<ApplyOutcome, sqlx::Error> {
        let mut inner = self.inner.lock().unwrap();
        let Inner {
            requests, balances, ..
        } = &mut *inner;

        let Some(request) = requests.get_mut(&id) else {
            return Ok(ApplyOutcome::Stale);
        };
        if request.state() != transition.expected {
            return Ok(ApplyOutcome::Stale);
        }

        if let Some(debit) = &transition.debit {
            let entry = balances.entry(debit.user_id).or_default();
            let balance = match debit.leave_type {
                LeaveType::Vacation => &mut entry.vacation,
                LeaveType::Administrative => &mut entry.administrative,
            };
            if *balance < debit.days {
                return Ok(ApplyOutcome::InsufficientBalance);
            }
            *balance -= debit.days;
        }

        request.status = transition.status;
        match transition.tier {
            ApprovalTier::Supervisor => {
                request.supervisor_approver_id = Some(transition.approver_id);
                request.supervisor_approved_at = Some(transition.decided_at);
            }
            ApprovalTier::Direction => {
                request.direction_approver_id = Some(transition.approver_id);
                request.direction_approved_at = Some(transition.decided_at);
            }
        }

        Ok(ApplyOutcome::Applied(request.clone()))
    }
}
