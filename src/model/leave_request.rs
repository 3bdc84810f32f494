use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveType {
    Vacation,
    Administrative,
}

impl LeaveType {
    /// Column on `users` holding the balance this type draws from.
    pub fn balance_column(self) -> &'static str {
        match self {
            LeaveType::Vacation => "vacation_days_balance",
            LeaveType::Administrative => "administrative_days_balance",
        }
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

/// Which reviewer acts on a request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalTier {
    Supervisor,
    Direction,
}

impl ApprovalTier {
    pub fn approver_column(self) -> &'static str {
        match self {
            ApprovalTier::Supervisor => "supervisor_approver_id",
            ApprovalTier::Direction => "direction_approver_id",
        }
    }

    pub fn approved_at_column(self) -> &'static str {
        match self {
            ApprovalTier::Supervisor => "supervisor_approved_at",
            ApprovalTier::Direction => "direction_approved_at",
        }
    }
}

/// Lifecycle state derived from `status` plus the approver columns.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum LeaveState {
    Pending { awaiting: ApprovalTier },
    Approved,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaveRequest {
    pub id: u64,
    pub leave_type: LeaveType,
    pub reason: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub requester_id: u64,
    pub status: LeaveStatus,
    pub supervisor_approver_id: Option<u64>,
    pub supervisor_approved_at: Option<DateTime<Utc>>,
    pub direction_approver_id: Option<u64>,
    pub direction_approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl LeaveRequest {
    pub fn state(&self) -> LeaveState {
        match self.status {
            LeaveStatus::Pending if self.supervisor_approver_id.is_none() => LeaveState::Pending {
                awaiting: ApprovalTier::Supervisor,
            },
            LeaveStatus::Pending => LeaveState::Pending {
                awaiting: ApprovalTier::Direction,
            },
            LeaveStatus::Approved => LeaveState::Approved,
            LeaveStatus::Rejected => LeaveState::Rejected,
            LeaveStatus::Cancelled => LeaveState::Cancelled,
        }
    }

    /// Inclusive number of calendar days covered by the request.
    pub fn span_days(&self) -> u32 {
        day_span(self.start_date, self.end_date)
    }
}

/// Inclusive day count; a same-day request is one day. Reversed ranges
/// count as zero, but submission rejects those before they get stored.
pub fn day_span(start: NaiveDate, end: NaiveDate) -> u32 {
    let days = (end - start).num_days() + 1;
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub leave_type: LeaveType,
    pub reason: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub requester_id: u64,
}

pub const LEAVE_COLUMNS: &str = "id, leave_type, reason, start_date, end_date, requester_id, status, \
     supervisor_approver_id, supervisor_approved_at, direction_approver_id, direction_approved_at, created_at";

#[derive(Debug, FromRow)]
pub struct LeaveRequestRow {
    pub id: u64,
    pub leave_type: String,
    pub reason: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub requester_id: u64,
    pub status: String,
    pub supervisor_approver_id: Option<u64>,
    pub supervisor_approved_at: Option<DateTime<Utc>>,
    pub direction_approver_id: Option<u64>,
    pub direction_approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<LeaveRequestRow> for LeaveRequest {
    type Error = sqlx::Error;

    fn try_from(row: LeaveRequestRow) -> Result<Self, Self::Error> {
        let leave_type = row
            .leave_type
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
        let status = row
            .status
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(LeaveRequest {
            id: row.id,
            leave_type,
            reason: row.reason,
            start_date: row.start_date,
            end_date: row.end_date,
            requester_id: row.requester_id,
            status,
            supervisor_approver_id: row.supervisor_approver_id,
            supervisor_approved_at: row.supervisor_approved_at,
            direction_approver_id: row.direction_approver_id,
            direction_approved_at: row.direction_approved_at,
            created_at: row.created_at,
        })
    }
}
