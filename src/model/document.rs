use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct Document {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Triage protocol 2025")]
    pub title: String,
    #[schema(example = "https://storage.example/docs/triage-2025.pdf")]
    pub url: String,
    pub description: Option<String>,
    pub creator_id: u64,
    #[schema(example = "Marta Soto")]
    pub creator_name: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

pub const DOCUMENT_SELECT: &str = r#"
    SELECT d.id, d.title, d.url, d.description, d.creator_id,
           u.full_name AS creator_name, d.created_at
    FROM documents d
    LEFT JOIN users u ON u.id = d.creator_id
"#;
