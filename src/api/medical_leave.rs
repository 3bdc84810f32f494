use crate::{
    auth::auth::AuthUser,
    model::medical_leave::{MEDICAL_LEAVE_SELECT, MedicalLeave},
    model::role::Capability,
    utils::db_utils::page_window,
    utils::response::{bad_request, internal_error, optional_text, required_text},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RegisterMedicalLeave {
    /// National id of the staff member on leave
    #[schema(example = "44444444-4")]
    pub national_id: Option<String>,
    #[schema(example = "2025-11-03", format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2025-11-07", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    /// Link to the scanned certificate in external storage
    pub file_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, PartialEq)]
struct ValidMedicalLeave {
    national_id: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    file_url: Option<String>,
    notes: Option<String>,
}

impl RegisterMedicalLeave {
    fn validate(self) -> Result<ValidMedicalLeave, actix_web::Error> {
        let national_id = required_text(self.national_id.as_deref(), "national_id")?;
        let (Some(start_date), Some(end_date)) = (self.start_date, self.end_date) else {
            return Err(bad_request("start_date and end_date are required"));
        };
        if end_date < start_date {
            return Err(bad_request("end_date cannot be before start_date"));
        }

        Ok(ValidMedicalLeave {
            national_id,
            start_date,
            end_date,
            file_url: optional_text(self.file_url.as_deref()),
            notes: optional_text(self.notes.as_deref()),
        })
    }
}

#[derive(Deserialize, IntoParams)]
pub struct MedicalLeaveQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct MedicalLeaveListResponse {
    pub data: Vec<MedicalLeave>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[utoipa::path(
    post,
    path = "/api/v1/medical-leave",
    request_body = RegisterMedicalLeave,
    responses(
        (status = 201, description = "Medical leave registered", body = MedicalLeave),
        (status = 400, description = "Missing fields or end_date before start_date"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "No staff member with that national id", body = Object, example = json!({
            "message": "Staff member not found"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Medical leave"
)]
pub async fn register_medical_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<RegisterMedicalLeave>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::RegisterMedicalLeave)?;

    let input = payload.into_inner().validate()?;

    let staff_id: Option<u64> = sqlx::query_scalar("SELECT id FROM users WHERE national_id = ?")
        .bind(&input.national_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to look up staff by national id");
            internal_error()
        })?;

    let Some(staff_id) = staff_id else {
        return Ok(HttpResponse::NotFound().json(json!({"message": "Staff member not found"})));
    };

    let result = sqlx::query(
        r#"
        INSERT INTO medical_leaves (staff_id, start_date, end_date, file_url, notes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(staff_id)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(&input.file_url)
    .bind(&input.notes)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, staff_id, "Failed to register medical leave");
        internal_error()
    })?;

    let id = result.last_insert_id();
    info!(medical_leave_id = id, staff_id, registered_by = auth.user_id, "Medical leave registered");

    let created = sqlx::query_as::<_, MedicalLeave>(&format!("{MEDICAL_LEAVE_SELECT} WHERE m.id = ?"))
        .bind(id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, medical_leave_id = id, "Failed to reload medical leave");
            internal_error()
        })?;

    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/medical-leave",
    params(MedicalLeaveQuery),
    responses(
        (status = 200, description = "Register, newest first", body = MedicalLeaveListResponse),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Medical leave"
)]
pub async fn list_medical_leave(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<MedicalLeaveQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ViewMedicalLeave)?;

    let (page, per_page, offset) = page_window(query.page, query.per_page);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medical_leaves")
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count medical leaves");
            internal_error()
        })?;

    let data = sqlx::query_as::<_, MedicalLeave>(&format!(
        "{MEDICAL_LEAVE_SELECT} ORDER BY m.created_at DESC, m.id DESC LIMIT ? OFFSET ?"
    ))
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list medical leaves");
        internal_error()
    })?;

    Ok(HttpResponse::Ok().json(MedicalLeaveListResponse {
        data,
        page,
        per_page,
        total,
    }))
}
