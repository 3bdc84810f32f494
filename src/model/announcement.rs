use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct Announcement {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Flu vaccination campaign")]
    pub title: String,
    #[schema(example = "Vaccines are available at the nursing station from Monday.")]
    pub content: String,
    pub author_id: u64,
    /// `None` when the author account no longer exists
    #[schema(example = "Marta Soto")]
    pub author_name: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

pub const ANNOUNCEMENT_SELECT: &str = r#"
    SELECT a.id, a.title, a.content, a.author_id, u.full_name AS author_name, a.created_at
    FROM announcements a
    LEFT JOIN users u ON u.id = a.author_id
"#;
