use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[schema(example = json!({
    "id": 3,
    "title": "Independence Day",
    "description": null,
    "start_date": "2025-09-18",
    "end_date": "2025-09-19",
    "is_holiday": true,
    "created_at": "2025-08-01T12:00:00Z"
}))]
pub struct Event {
    pub id: u64,
    pub title: String,
    pub description: Option<String>,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    pub is_holiday: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

pub const EVENT_COLUMNS: &str = "id, title, description, start_date, end_date, is_holiday, created_at";
