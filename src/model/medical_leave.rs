use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

/// A register entry joined with the staff member it belongs to.
#[derive(Debug, Serialize, FromRow, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "staff_id": 4,
    "full_name": "Ana Rojas",
    "national_id": "44444444-4",
    "position": "Administrative assistant",
    "start_date": "2025-11-03",
    "end_date": "2025-11-07",
    "file_url": "https://storage.example/licencias/ana-1103.pdf",
    "notes": null,
    "status": "REGISTERED",
    "created_at": "2025-11-03T08:15:00Z"
}))]
pub struct MedicalLeave {
    pub id: u64,
    pub staff_id: u64,
    pub full_name: String,
    pub national_id: String,
    pub position: Option<String>,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub file_url: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

pub const MEDICAL_LEAVE_SELECT: &str = r#"
    SELECT m.id, m.staff_id, u.full_name, u.national_id, u.position,
           m.start_date, m.end_date, m.file_url, m.notes, m.status, m.created_at
    FROM medical_leaves m
    JOIN users u ON u.id = m.staff_id
"#;
