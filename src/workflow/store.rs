use async_trait::async_trait;
use sqlx::{MySql, MySqlPool, Transaction};

use crate::model::leave_request::{
    ApprovalTier, LEAVE_COLUMNS, LeaveRequest, LeaveRequestRow, LeaveState, LeaveStatus,
    NewLeaveRequest,
};
use crate::workflow::state::Transition;

/// Which requests a listing may return.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LeaveScope {
    RequestedBy(u64),
    AwaitingSupervisor,
    AwaitingDirection,
    All,
}

#[derive(Debug, Clone)]
pub struct LeaveQuery {
    pub scope: LeaveScope,
    pub status: Option<LeaveStatus>,
    pub page: u64,
    pub per_page: u64,
}

impl LeaveQuery {
    /// Rows to skip. Saturates so an absurd page number reads an empty page.
    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }

    /// The status filter as its stored column value.
    pub fn status_param(&self) -> Option<String> {
        self.status.map(|status| status.to_string())
    }
}

#[derive(Debug)]
pub struct LeavePage {
    pub data: Vec<LeaveRequest>,
    pub total: i64,
}

#[derive(Debug)]
pub enum ApplyOutcome {
    Applied(LeaveRequest),
    /// The request moved on since the transition was planned.
    Stale,
    InsufficientBalance,
}

#[async_trait]
pub trait LeaveStore: Send + Sync {
    async fn insert(&self, new: NewLeaveRequest) -> Result<LeaveRequest, sqlx::Error>;

    async fn find(&self, id: u64) -> Result<Option<LeaveRequest>, sqlx::Error>;

    async fn list(&self, query: &LeaveQuery) -> Result<LeavePage, sqlx::Error>;

    /// Applies the status change and, when present, the balance debit as one
    /// atomic unit. Nothing is written unless both succeed.
    async fn apply(&self, id: u64, transition: &Transition) -> Result<ApplyOutcome, sqlx::Error>;
}

pub struct MySqlLeaveStore {
    pool: MySqlPool,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// WHERE fragment selecting rows still in `expected`.
fn state_guard(expected: LeaveState) -> Option<&'static str> {
    match expected {
        LeaveState::Pending {
            awaiting: ApprovalTier::Supervisor,
        } => Some("status = 'PENDING' AND supervisor_approver_id IS NULL"),
        LeaveState::Pending {
            awaiting: ApprovalTier::Direction,
        } => Some(
            "status = 'PENDING' AND supervisor_approver_id IS NOT NULL AND direction_approver_id IS NULL",
        ),
        LeaveState::Approved | LeaveState::Rejected | LeaveState::Cancelled => None,
    }
}

fn scope_clause(scope: LeaveScope) -> &'static str {
    match scope {
        LeaveScope::RequestedBy(_) => " AND requester_id = ?",
        LeaveScope::AwaitingSupervisor => " AND supervisor_approver_id IS NULL",
        LeaveScope::AwaitingDirection => {
            " AND supervisor_approver_id IS NOT NULL AND direction_approver_id IS NULL"
        }
        LeaveScope::All => "",
    }
}

fn build_where(query: &LeaveQuery) -> String {
    let mut where_sql = String::from(" WHERE 1=1");
    where_sql.push_str(scope_clause(query.scope));
    if query.status.is_some() {
        where_sql.push_str(" AND status = ?");
    }
    where_sql
}

fn update_sql(transition: &Transition) -> Option<String> {
    let guard = state_guard(transition.expected)?;
    Some(format!(
        "UPDATE leave_requests SET status = ?, {} = ?, {} = ? WHERE id = ? AND {}",
        transition.tier.approver_column(),
        transition.tier.approved_at_column(),
        guard
    ))
}

async fn fetch_in_tx(
    tx: &mut Transaction<'_, MySql>,
    id: u64,
) -> Result<LeaveRequest, sqlx::Error> {
    let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
    let row = sqlx::query_as::<_, LeaveRequestRow>(&sql)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
    LeaveRequest::try_from(row)
}

#[async_trait]
impl LeaveStore for MySqlLeaveStore {
    async fn insert(&self, new: NewLeaveRequest) -> Result<LeaveRequest, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (leave_type, reason, start_date, end_date, requester_id, status)
            VALUES (?, ?, ?, ?, ?, 'PENDING')
            "#,
        )
        .bind(new.leave_type.as_ref())
        .bind(&new.reason)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.requester_id)
        .execute(&mut *tx)
        .await?;

        let created = fetch_in_tx(&mut tx, result.last_insert_id()).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn find(&self, id: u64) -> Result<Option<LeaveRequest>, sqlx::Error> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
        sqlx::query_as::<_, LeaveRequestRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LeaveRequest::try_from)
            .transpose()
    }

    async fn list(&self, query: &LeaveQuery) -> Result<LeavePage, sqlx::Error> {
        let where_sql = build_where(query);

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        if let LeaveScope::RequestedBy(id) = query.scope {
            count_q = count_q.bind(id);
        }
        if let Some(status) = query.status_param() {
            count_q = count_q.bind(status);
        }
        let total = count_q.fetch_one(&self.pool).await?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            "SELECT {LEAVE_COLUMNS} FROM leave_requests{where_sql} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        let mut data_q = sqlx::query_as::<_, LeaveRequestRow>(&data_sql);
        if let LeaveScope::RequestedBy(id) = query.scope {
            data_q = data_q.bind(id);
        }
        if let Some(status) = query.status_param() {
            data_q = data_q.bind(status);
        }
        let rows = data_q
            .bind(query.per_page)
            .bind(query.offset())
            .fetch_all(&self.pool)
            .await?;

        let data = rows
            .into_iter()
            .map(LeaveRequest::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LeavePage { data, total })
    }

    async fn apply(&self, id: u64, transition: &Transition) -> Result<ApplyOutcome, sqlx::Error> {
        let Some(sql) = update_sql(transition) else {
            return Ok(ApplyOutcome::Stale);
        };

        let mut tx = self.pool.begin().await?;

        // Compare-and-swap on the lifecycle state; a concurrent decision that
        // committed first leaves zero matching rows here.
        let updated = sqlx::query(&sql)
            .bind(transition.status.as_ref())
            .bind(transition.approver_id)
            .bind(transition.decided_at)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(ApplyOutcome::Stale);
        }

        if let Some(debit) = &transition.debit {
            let column = debit.leave_type.balance_column();
            let debit_sql = format!(
                "UPDATE users SET {column} = {column} - ? WHERE id = ? AND {column} >= ?"
            );
            let debited = sqlx::query(&debit_sql)
                .bind(debit.days)
                .bind(debit.user_id)
                .bind(debit.days)
                .execute(&mut *tx)
                .await?;

            if debited.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(ApplyOutcome::InsufficientBalance);
            }
        }

        let request = fetch_in_tx(&mut tx, id).await?;
        tx.commit().await?;
        Ok(ApplyOutcome::Applied(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::leave_request::LeaveType;
    use crate::workflow::state::BalanceDebit;
    use chrono::Utc;

    fn transition(expected: LeaveState, tier: ApprovalTier) -> Transition {
        Transition {
            expected,
            tier,
            approver_id: 1,
            decided_at: Utc::now(),
            status: LeaveStatus::Approved,
            debit: Some(BalanceDebit {
                user_id: 2,
                leave_type: LeaveType::Vacation,
                days: 3,
            }),
        }
    }

    #[test]
    fn direction_update_is_guarded_by_forwarded_state() {
        let sql = update_sql(&transition(
            LeaveState::Pending {
                awaiting: ApprovalTier::Direction,
            },
            ApprovalTier::Direction,
        ))
        .unwrap();

        assert!(sql.contains("direction_approver_id = ?, direction_approved_at = ?"));
        assert!(sql.ends_with(
            "status = 'PENDING' AND supervisor_approver_id IS NOT NULL AND direction_approver_id IS NULL"
        ));
    }

    #[test]
    fn terminal_state_has_no_update() {
        assert!(update_sql(&transition(LeaveState::Approved, ApprovalTier::Direction)).is_none());
    }

    #[test]
    fn where_clause_follows_scope_and_status() {
        let query = LeaveQuery {
            scope: LeaveScope::RequestedBy(4),
            status: Some(LeaveStatus::Pending),
            page: 3,
            per_page: 10,
        };
        assert_eq!(
            build_where(&query),
            " WHERE 1=1 AND requester_id = ? AND status = ?"
        );
        assert_eq!(query.offset(), 20);
        assert_eq!(query.status_param().as_deref(), Some("PENDING"));

        let query = LeaveQuery {
            scope: LeaveScope::AwaitingSupervisor,
            status: None,
            page: 1,
            per_page: 10,
        };
        assert_eq!(
            build_where(&query),
            " WHERE 1=1 AND supervisor_approver_id IS NULL"
        );
    }

    #[test]
    fn offset_saturates_on_huge_pages() {
        let query = LeaveQuery {
            scope: LeaveScope::All,
            status: None,
            page: u64::MAX,
            per_page: 100,
        };
        assert_eq!(query.offset(), u64::MAX);
        assert_eq!(query.status_param(), None);

        let first = LeaveQuery { page: 0, ..query };
        assert_eq!(first.offset(), 0);
    }
}
