use crate::auth::auth::AuthUser;
use crate::model::leave_request::{LeaveRequest, LeaveState, LeaveStatus, LeaveType};
use crate::workflow::{DecisionAction, LeaveError, LeaveWorkflow, SubmitLeave};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "leave_type": "VACATION",
    "reason": "Family holidays",
    "start_date": "2025-12-20",
    "end_date": "2026-01-05",
    "requester_id": 4,
    "status": "PENDING",
    "state": {"phase": "pending", "awaiting": "direction"},
    "days": 17,
    "supervisor_approver_id": 3,
    "supervisor_approved_at": "2025-12-01T10:00:00Z",
    "direction_approver_id": null,
    "direction_approved_at": null,
    "created_at": "2025-11-28T09:30:00Z"
}))]
pub struct LeaveResponse {
    pub id: u64,
    pub leave_type: LeaveType,
    pub reason: Option<String>,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub requester_id: u64,
    pub status: LeaveStatus,
    /// Lifecycle phase; `awaiting` tells which reviewer is next
    #[schema(value_type = Object)]
    pub state: LeaveState,
    /// Inclusive length of the request in calendar days
    pub days: u32,
    pub supervisor_approver_id: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub supervisor_approved_at: Option<DateTime<Utc>>,
    pub direction_approver_id: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub direction_approved_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<LeaveRequest> for LeaveResponse {
    fn from(r: LeaveRequest) -> Self {
        LeaveResponse {
            state: r.state(),
            days: r.span_days(),
            id: r.id,
            leave_type: r.leave_type,
            reason: r.reason,
            start_date: r.start_date,
            end_date: r.end_date,
            requester_id: r.requester_id,
            status: r.status,
            supervisor_approver_id: r.supervisor_approver_id,
            supervisor_approved_at: r.supervisor_approved_at,
            direction_approver_id: r.direction_approver_id,
            direction_approved_at: r.direction_approved_at,
            created_at: r.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveResponse>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = "PENDING")]
    /// Filter by leave status
    pub status: Option<String>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    #[schema(example = 10)]
    /// Items per page, at most 100
    pub per_page: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct DecideLeave {
    #[schema(example = "approve")]
    pub action: Option<DecisionAction>,
}

/* =========================
Submit leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/v1/leave",
    request_body(
        content = SubmitLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveResponse),
        (status = 400, description = "Missing fields or end_date before start_date"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    workflow: web::Data<LeaveWorkflow>,
    payload: web::Json<SubmitLeave>,
) -> Result<HttpResponse, LeaveError> {
    let created = workflow.submit(auth.caller(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(LeaveResponse::from(created)))
}

/* =========================
Approve or reject (reviewers)
========================= */
#[utoipa::path(
    put,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to decide")
    ),
    request_body = DecideLeave,
    responses(
        (status = 200, description = "Decision recorded", body = LeaveResponse),
        (status = 400, description = "Missing action or insufficient day balance", body = Object, example = json!({
            "message": "Insufficient vacation balance: 17 days requested"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Caller cannot review leave requests"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Not this reviewer's turn, already decided, or decided concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn decide_leave(
    auth: AuthUser,
    workflow: web::Data<LeaveWorkflow>,
    path: web::Path<u64>,
    payload: web::Json<DecideLeave>,
) -> Result<HttpResponse, LeaveError> {
    let action = payload
        .action
        .ok_or_else(|| LeaveError::Validation("action is required".into()))?;

    let updated = workflow
        .decide(auth.caller(), path.into_inner(), action)
        .await?;

    Ok(HttpResponse::Ok().json(LeaveResponse::from(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Staff may only read their own requests"),
        (status = 404, description = "Leave request not found", body = Object, example = json!({
            "message": "Leave request not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    workflow: web::Data<LeaveWorkflow>,
    path: web::Path<u64>,
) -> Result<HttpResponse, LeaveError> {
    let request = workflow.get(auth.caller(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(LeaveResponse::from(request)))
}

/// Lists the requests visible to the caller: staff see their own,
/// supervisors and direction see their review queue, admins see all.
#[utoipa::path(
    get,
    path = "/api/v1/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 400, description = "Unknown status filter"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    workflow: web::Data<LeaveWorkflow>,
    query: web::Query<LeaveFilter>,
) -> Result<HttpResponse, LeaveError> {
    let filter = query.into_inner();

    let status = match filter.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(LeaveStatus::from_str(&s.to_uppercase()).map_err(|_| {
            LeaveError::Validation(
                "Invalid status. Allowed: PENDING, APPROVED, REJECTED, CANCELLED".into(),
            )
        })?),
    };

    let (page, query) = workflow
        .list(auth.caller(), status, filter.page, filter.per_page)
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data: page.data.into_iter().map(LeaveResponse::from).collect(),
        page: query.page,
        per_page: query.per_page,
        total: page.total,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::config::Config;
    use crate::model::role::Role;
    use crate::routes::leave_scope;
    use crate::utils::response::{json_config, path_config, query_config};
    use crate::workflow::memory::{Balances, InMemoryLeaveStore};
    use actix_web::{App, http::StatusCode, test};
    use serde_json::{Value, json};
    use std::sync::Arc;

    const SECRET: &str = "leave-http-secret";
    const STAFF_ID: u64 = 10;
    const SUPERVISOR_ID: u64 = 3;
    const DIRECTOR_ID: u64 = 1;

    fn config() -> Config {
        Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("mysql://unused".into()),
            "JWT_SECRET" => Some(SECRET.into()),
            "SERVER_ADDR" => Some("127.0.0.1:0".into()),
            _ => None,
        })
        .unwrap()
    }

    fn bearer(user_id: u64, role: Role) -> (&'static str, String) {
        let token = generate_access_token(user_id, "user@clinic.example", role, SECRET, 60).unwrap();
        ("Authorization", format!("Bearer {token}"))
    }

    fn store(vacation: u32) -> Arc<InMemoryLeaveStore> {
        Arc::new(InMemoryLeaveStore::default().with_user(
            STAFF_ID,
            Balances {
                vacation,
                administrative: 6,
            },
        ))
    }

    macro_rules! app {
        ($store:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(config()))
                    .app_data(web::Data::new(LeaveWorkflow::new($store.clone())))
                    .app_data(json_config())
                    .app_data(query_config())
                    .app_data(path_config())
                    .service(leave_scope()),
            )
            .await
        };
    }

    fn holidays() -> Value {
        json!({
            "leave_type": "VACATION",
            "reason": "Family holidays",
            "start_date": "2025-12-20",
            "end_date": "2026-01-05"
        })
    }

    #[actix_web::test]
    async fn two_step_approval_over_http_debits_balance() {
        let store = store(20);
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/leave")
            .insert_header(bearer(STAFF_ID, Role::Staff))
            .set_json(holidays())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["status"], "PENDING");
        assert_eq!(created["days"], 17);
        assert_eq!(created["state"], json!({"phase": "pending", "awaiting": "supervisor"}));
        let id = created["id"].as_u64().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/leave/{id}"))
            .insert_header(bearer(SUPERVISOR_ID, Role::Supervisor))
            .set_json(json!({"action": "approve"}))
            .to_request();
        let forwarded: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(forwarded["status"], "PENDING");
        assert_eq!(forwarded["supervisor_approver_id"], SUPERVISOR_ID);
        assert_eq!(forwarded["state"]["awaiting"], "direction");

        let req = test::TestRequest::patch()
            .uri(&format!("/leave/{id}"))
            .insert_header(bearer(DIRECTOR_ID, Role::Direction))
            .set_json(json!({"action": "aprobar"}))
            .to_request();
        let approved: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(approved["status"], "APPROVED");
        assert_eq!(approved["direction_approver_id"], DIRECTOR_ID);

        assert_eq!(store.balances(STAFF_ID).vacation, 3);
    }

    #[actix_web::test]
    async fn insufficient_balance_is_a_bad_request() {
        let store = store(10);
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/leave")
            .insert_header(bearer(STAFF_ID, Role::Staff))
            .set_json(holidays())
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_u64().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/leave/{id}"))
            .insert_header(bearer(SUPERVISOR_ID, Role::Supervisor))
            .set_json(json!({"action": "approve"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::put()
            .uri(&format!("/leave/{id}"))
            .insert_header(bearer(DIRECTOR_ID, Role::DeputyDirection))
            .set_json(json!({"action": "approve"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Insufficient vacation balance: 17 days requested");

        assert_eq!(store.balances(STAFF_ID).vacation, 10);

        let req = test::TestRequest::get()
            .uri(&format!("/leave/{id}"))
            .insert_header(bearer(STAFF_ID, Role::Staff))
            .to_request();
        let current: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(current["state"], json!({"phase": "pending", "awaiting": "direction"}));
    }

    #[actix_web::test]
    async fn out_of_turn_decision_conflicts() {
        let store = store(20);
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/leave")
            .insert_header(bearer(STAFF_ID, Role::Staff))
            .set_json(holidays())
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_u64().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/leave/{id}"))
            .insert_header(bearer(DIRECTOR_ID, Role::Direction))
            .set_json(json!({"action": "approve"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn staff_cannot_decide_and_missing_action_is_rejected() {
        let store = store(20);
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/leave")
            .insert_header(bearer(STAFF_ID, Role::Staff))
            .set_json(holidays())
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_u64().unwrap();

        let req = test::TestRequest::put()
            .uri(&format!("/leave/{id}"))
            .insert_header(bearer(STAFF_ID, Role::Staff))
            .set_json(json!({"action": "approve"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::put()
            .uri(&format!("/leave/{id}"))
            .insert_header(bearer(SUPERVISOR_ID, Role::Supervisor))
            .set_json(json!({}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::put()
            .uri("/leave/999")
            .insert_header(bearer(SUPERVISOR_ID, Role::Supervisor))
            .set_json(json!({"action": "reject"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn submit_without_dates_is_a_validation_error() {
        let store = store(20);
        let app = app!(store);

        let req = test::TestRequest::post()
            .uri("/leave")
            .insert_header(bearer(STAFF_ID, Role::Staff))
            .set_json(json!({"leave_type": "ADMINISTRATIVE"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn requests_without_token_are_unauthorized() {
        let store = store(20);
        let app = app!(store);

        let req = test::TestRequest::get().uri("/leave").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn listing_follows_visibility_and_status_filter() {
        let store = store(20);
        let app = app!(store);

        for _ in 0..2 {
            let req = test::TestRequest::post()
                .uri("/leave")
                .insert_header(bearer(STAFF_ID, Role::Staff))
                .set_json(holidays())
                .to_request();
            test::call_service(&app, req).await;
        }

        let req = test::TestRequest::put()
            .uri("/leave/1")
            .insert_header(bearer(SUPERVISOR_ID, Role::Supervisor))
            .set_json(json!({"action": "reject"}))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get()
            .uri("/leave")
            .insert_header(bearer(SUPERVISOR_ID, Role::Supervisor))
            .to_request();
        let queue: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(queue["total"], 1);
        assert_eq!(queue["data"][0]["id"], 2);

        let req = test::TestRequest::get()
            .uri("/leave?status=rejected&per_page=500")
            .insert_header(bearer(STAFF_ID, Role::Staff))
            .to_request();
        let own: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(own["total"], 1);
        assert_eq!(own["per_page"], 100);
        assert_eq!(own["data"][0]["status"], "REJECTED");

        let req = test::TestRequest::get()
            .uri("/leave")
            .insert_header(bearer(STAFF_ID + 1, Role::Staff))
            .to_request();
        let other: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(other["total"], 0);

        let req = test::TestRequest::get()
            .uri("/leave?status=archived")
            .insert_header(bearer(STAFF_ID, Role::Staff))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn malformed_input_answers_with_json_message() {
        let store = store(20);
        let app = app!(store);

        let mut sick = holidays();
        sick["leave_type"] = json!("SICK");
        let requests = [
            test::TestRequest::post()
                .uri("/leave")
                .insert_header(bearer(STAFF_ID, Role::Staff))
                .set_json(sick),
            test::TestRequest::post()
                .uri("/leave")
                .insert_header(bearer(STAFF_ID, Role::Staff))
                .set_json(json!({"leave_type": "VACATION", "start_date": "20-12-2025"})),
            test::TestRequest::get()
                .uri("/leave/abc")
                .insert_header(bearer(STAFF_ID, Role::Staff)),
            test::TestRequest::get()
                .uri("/leave?page=first")
                .insert_header(bearer(STAFF_ID, Role::Staff)),
        ];

        for req in requests {
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: Value = test::read_body_json(resp).await;
            assert!(body["message"].is_string(), "unexpected body {body}");
        }

        assert_eq!(store.balances(STAFF_ID).vacation, 20);
    }
}
