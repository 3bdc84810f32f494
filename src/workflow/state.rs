//! Pure decision rules of the leave workflow. Nothing in here touches the
//! database; the store applies the resulting [`Transition`] atomically.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::model::leave_request::{
    ApprovalTier, LeaveRequest, LeaveState, LeaveStatus, LeaveType, NewLeaveRequest,
};
use crate::model::role::{Capability, Role};
use crate::workflow::error::LeaveError;

/// Verified identity of whoever is calling the workflow.
#[derive(Debug, Copy, Clone)]
pub struct Caller {
    pub id: u64,
    pub role: Role,
}

impl Caller {
    pub fn approval_tier(&self) -> Option<ApprovalTier> {
        if self.role.can(Capability::ReviewAsSupervisor) {
            Some(ApprovalTier::Supervisor)
        } else if self.role.can(Capability::ReviewAsDirection) {
            Some(ApprovalTier::Direction)
        } else {
            None
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    #[serde(alias = "aprobar")]
    Approve,
    #[serde(alias = "rechazar")]
    Reject,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BalanceDebit {
    pub user_id: u64,
    pub leave_type: LeaveType,
    pub days: u32,
}

/// A state change the store must apply all-or-nothing. `expected` is the
/// state the request had when the decision was planned; the store refuses
/// the write if the row no longer matches it.
#[derive(Debug, Clone)]
pub struct Transition {
    pub expected: LeaveState,
    pub tier: ApprovalTier,
    pub approver_id: u64,
    pub decided_at: DateTime<Utc>,
    pub status: LeaveStatus,
    pub debit: Option<BalanceDebit>,
}

pub fn plan_decision(
    request: &LeaveRequest,
    caller: Caller,
    action: DecisionAction,
    now: DateTime<Utc>,
) -> Result<Transition, LeaveError> {
    let tier = caller
        .approval_tier()
        .ok_or(LeaveError::Forbidden("decide leave requests"))?;

    let state = request.state();
    match state {
        LeaveState::Pending { awaiting } if awaiting == tier => {}
        LeaveState::Pending {
            awaiting: ApprovalTier::Supervisor,
        } => {
            return Err(LeaveError::Conflict(
                "Leave request has not been reviewed by a supervisor yet".into(),
            ));
        }
        LeaveState::Pending {
            awaiting: ApprovalTier::Direction,
        } => {
            return Err(LeaveError::Conflict(
                "Leave request was already forwarded to direction".into(),
            ));
        }
        LeaveState::Approved | LeaveState::Rejected | LeaveState::Cancelled => {
            return Err(LeaveError::Conflict(format!(
                "Leave request is already {}",
                request.status.as_ref().to_lowercase()
            )));
        }
    }

    let (status, debit) = match (tier, action) {
        (ApprovalTier::Supervisor, DecisionAction::Approve) => (LeaveStatus::Pending, None),
        (ApprovalTier::Direction, DecisionAction::Approve) => (
            LeaveStatus::Approved,
            Some(BalanceDebit {
                user_id: request.requester_id,
                leave_type: request.leave_type,
                days: request.span_days(),
            }),
        ),
        (_, DecisionAction::Reject) => (LeaveStatus::Rejected, None),
    };

    Ok(Transition {
        expected: state,
        tier,
        approver_id: caller.id,
        decided_at: now,
        status,
        debit,
    })
}

/// Raw submission as it arrives over the wire; every field may be absent.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SubmitLeave {
    #[schema(example = "VACATION")]
    pub leave_type: Option<LeaveType>,
    #[schema(example = "Family holidays")]
    pub reason: Option<String>,
    #[schema(example = "2025-12-20", format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2026-01-05", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
}

impl SubmitLeave {
    pub fn validate(self, requester_id: u64) -> Result<NewLeaveRequest, LeaveError> {
        let (Some(leave_type), Some(start_date), Some(end_date)) =
            (self.leave_type, self.start_date, self.end_date)
        else {
            return Err(LeaveError::Validation(
                "leave_type, start_date and end_date are required".into(),
            ));
        };

        if end_date < start_date {
            return Err(LeaveError::Validation(
                "start_date cannot be after end_date".into(),
            ));
        }

        let reason = self
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());

        Ok(NewLeaveRequest {
            leave_type,
            reason,
            start_date,
            end_date,
            requester_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn request(status: LeaveStatus, supervisor: Option<u64>) -> LeaveRequest {
        LeaveRequest {
            id: 7,
            leave_type: LeaveType::Vacation,
            reason: None,
            start_date: date("2025-12-20"),
            end_date: date("2026-01-05"),
            requester_id: 10,
            status,
            supervisor_approver_id: supervisor,
            supervisor_approved_at: None,
            direction_approver_id: None,
            direction_approved_at: None,
            created_at: Utc::now(),
        }
    }

    const SUPERVISOR: Caller = Caller {
        id: 3,
        role: Role::Supervisor,
    };
    const DIRECTOR: Caller = Caller {
        id: 1,
        role: Role::Direction,
    };
    const DEPUTY: Caller = Caller {
        id: 2,
        role: Role::DeputyDirection,
    };

    #[test]
    fn supervisor_approve_forwards_without_debit() {
        let t = plan_decision(
            &request(LeaveStatus::Pending, None),
            SUPERVISOR,
            DecisionAction::Approve,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(t.tier, ApprovalTier::Supervisor);
        assert_eq!(t.status, LeaveStatus::Pending);
        assert_eq!(t.approver_id, 3);
        assert!(t.debit.is_none());
    }

    #[test]
    fn supervisor_reject_is_final() {
        let t = plan_decision(
            &request(LeaveStatus::Pending, None),
            SUPERVISOR,
            DecisionAction::Reject,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(t.status, LeaveStatus::Rejected);
        assert!(t.debit.is_none());
    }

    #[test]
    fn direction_approve_debits_inclusive_span() {
        let t = plan_decision(
            &request(LeaveStatus::Pending, Some(3)),
            DEPUTY,
            DecisionAction::Approve,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(t.tier, ApprovalTier::Direction);
        assert_eq!(t.status, LeaveStatus::Approved);
        assert_eq!(
            t.debit,
            Some(BalanceDebit {
                user_id: 10,
                leave_type: LeaveType::Vacation,
                days: 17
            })
        );
    }

    #[test]
    fn direction_cannot_skip_the_supervisor() {
        let err = plan_decision(
            &request(LeaveStatus::Pending, None),
            DIRECTOR,
            DecisionAction::Approve,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LeaveError::Conflict(_)));
    }

    #[test]
    fn supervisor_cannot_act_twice() {
        let err = plan_decision(
            &request(LeaveStatus::Pending, Some(3)),
            SUPERVISOR,
            DecisionAction::Reject,
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, LeaveError::Conflict(_)));
    }

    #[test]
    fn terminal_requests_reject_every_decision() {
        for status in [LeaveStatus::Approved, LeaveStatus::Rejected, LeaveStatus::Cancelled] {
            for caller in [SUPERVISOR, DIRECTOR] {
                let err = plan_decision(
                    &request(status, Some(3)),
                    caller,
                    DecisionAction::Approve,
                    Utc::now(),
                )
                .unwrap_err();
                assert!(matches!(err, LeaveError::Conflict(_)), "{status} / {:?}", caller.role);
            }
        }
    }

    #[test]
    fn non_reviewers_are_forbidden() {
        for role in [Role::Staff, Role::Admin] {
            let err = plan_decision(
                &request(LeaveStatus::Pending, None),
                Caller { id: 9, role },
                DecisionAction::Approve,
                Utc::now(),
            )
            .unwrap_err();
            assert!(matches!(err, LeaveError::Forbidden(_)));
        }
    }

    #[test]
    fn action_accepts_spanish_aliases() {
        let a: DecisionAction = serde_json::from_str("\"rechazar\"").unwrap();
        assert_eq!(a, DecisionAction::Reject);
        let a: DecisionAction = serde_json::from_str("\"approve\"").unwrap();
        assert_eq!(a, DecisionAction::Approve);
        assert!(serde_json::from_str::<DecisionAction>("\"maybe\"").is_err());
    }

    #[test]
    fn submission_requires_type_and_dates() {
        let missing_end = SubmitLeave {
            leave_type: Some(LeaveType::Vacation),
            start_date: Some(date("2025-03-01")),
            ..Default::default()
        };
        assert!(matches!(
            missing_end.validate(1),
            Err(LeaveError::Validation(_))
        ));
    }

    #[test]
    fn submission_rejects_reversed_range_and_blank_reason() {
        let reversed = SubmitLeave {
            leave_type: Some(LeaveType::Administrative),
            reason: None,
            start_date: Some(date("2025-03-02")),
            end_date: Some(date("2025-03-01")),
        };
        assert!(reversed.validate(1).is_err());

        let ok = SubmitLeave {
            leave_type: Some(LeaveType::Administrative),
            reason: Some("   ".into()),
            start_date: Some(date("2025-03-01")),
            end_date: Some(date("2025-03-01")),
        }
        .validate(5)
        .unwrap();
        assert_eq!(ok.requester_id, 5);
        assert!(ok.reason.is_none());
    }
}
