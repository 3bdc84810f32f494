use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::model::role::Role;

/// Row used by login and refresh: the only place the password hash leaves the table.
#[derive(Debug, FromRow)]
pub struct UserCredentials {
    pub id: u64,
    pub email: String,
    pub password: String,
    pub role: String,
    pub is_active: bool,
}

#[derive(Debug, Serialize, FromRow, ToSchema)]
#[schema(example = json!({
    "id": 4,
    "full_name": "Ana Rojas",
    "email": "ana.rojas@clinic.example",
    "role": "STAFF",
    "national_id": "44444444-4",
    "phone": "912345681",
    "position": "Administrative assistant",
    "supervisor_id": 3,
    "vacation_days_balance": 15,
    "administrative_days_balance": 6,
    "is_active": true,
    "created_at": "2025-10-01T12:00:00Z"
}))]
pub struct User {
    pub id: u64,
    pub full_name: String,
    pub email: String,
    #[schema(value_type = String)]
    pub role: String,
    pub national_id: String,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub supervisor_id: Option<u64>,
    pub vacation_days_balance: u32,
    pub administrative_days_balance: u32,
    pub is_active: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

pub const USER_COLUMNS: &str = "id, full_name, email, role, national_id, phone, position, \
     supervisor_id, vacation_days_balance, administrative_days_balance, is_active, created_at";

/// What `GET /me` answers with.
#[derive(Debug, Serialize, FromRow, ToSchema)]
pub struct Profile {
    pub id: u64,
    pub full_name: String,
    pub email: String,
    #[schema(value_type = String)]
    pub role: String,
    pub position: Option<String>,
    pub vacation_days_balance: u32,
    pub administrative_days_balance: u32,
}

impl UserCredentials {
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    /// Role a new session may carry: the current one, and none at all once
    /// the account is deactivated.
    pub fn session_role(&self) -> Option<Role> {
        if self.is_active { self.role() } else { None }
    }
}
