use crate::{
    auth::{auth::AuthUser, password::hash_password},
    model::role::{Capability, Role},
    model::user::{USER_COLUMNS, User},
    utils::db_utils::{
        Changes, SqlValue, build_update_sql, execute_update, is_unique_violation, page_window,
    },
    utils::response::{bad_request, internal_error, json_error, optional_text, required_text},
};
use actix_web::{HttpResponse, Responder, http::StatusCode, web};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateUser {
    #[schema(example = "Ana Rojas")]
    pub full_name: Option<String>,
    #[schema(example = "ana.rojas@clinic.example", format = "email")]
    pub email: Option<String>,
    #[schema(example = "123456")]
    pub password: Option<String>,
    pub role: Option<Role>,
    #[schema(example = "44444444-4")]
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub supervisor_id: Option<u64>,
    #[schema(example = 15)]
    pub vacation_days_balance: Option<u32>,
    #[schema(example = 6)]
    pub administrative_days_balance: Option<u32>,
}

/// Validated create payload, password still in clear.
#[derive(Debug)]
struct NewUser {
    full_name: String,
    email: String,
    password: String,
    role: Role,
    national_id: String,
    phone: Option<String>,
    position: Option<String>,
    supervisor_id: Option<u64>,
    vacation_days_balance: u32,
    administrative_days_balance: u32,
}

impl CreateUser {
    fn validate(self) -> Result<NewUser, actix_web::Error> {
        let password = self
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| bad_request("password is required"))?;

        Ok(NewUser {
            full_name: required_text(self.full_name.as_deref(), "full_name")?,
            email: required_text(self.email.as_deref(), "email")?.to_lowercase(),
            password,
            role: self.role.ok_or_else(|| bad_request("role is required"))?,
            national_id: required_text(self.national_id.as_deref(), "national_id")?,
            phone: optional_text(self.phone.as_deref()),
            position: optional_text(self.position.as_deref()),
            supervisor_id: self.supervisor_id,
            vacation_days_balance: self.vacation_days_balance.unwrap_or(15),
            administrative_days_balance: self.administrative_days_balance.unwrap_or(6),
        })
    }
}

/// Marks a key that was sent, so an explicit `null` is told apart from a
/// missing key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUser {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub national_id: Option<String>,
    /// Blank clears the phone
    pub phone: Option<String>,
    /// Blank clears the position
    pub position: Option<String>,
    /// `null` removes the supervisor link, an absent key leaves it alone
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<u64>)]
    pub supervisor_id: Option<Option<u64>>,
    #[schema(example = 12)]
    pub vacation_days_balance: Option<u32>,
    pub administrative_days_balance: Option<u32>,
    pub is_active: Option<bool>,
}

impl UpdateUser {
    /// Refuses edits that would lock the caller out of user management.
    fn check_self_edit(&self, caller: &AuthUser, target_id: u64) -> Result<(), actix_web::Error> {
        if caller.user_id != target_id {
            return Ok(());
        }
        if self.role.is_some_and(|r| !r.can(Capability::ManageUsers)) {
            return Err(json_error(StatusCode::FORBIDDEN, "You cannot remove your own admin role"));
        }
        if self.is_active == Some(false) {
            return Err(json_error(StatusCode::FORBIDDEN, "You cannot deactivate yourself"));
        }
        Ok(())
    }

    /// Changes that must end the user's open sessions, so no refresh token
    /// outlives a new role, a new password or a deactivation.
    fn ends_sessions(&self) -> bool {
        self.role.is_some() || self.password.is_some() || self.is_active == Some(false)
    }

    /// Column changes with the password already hashed.
    fn into_changes(self) -> Result<Changes, actix_web::Error> {
        let mut changes: Changes = Vec::new();

        if let Some(v) = self.full_name {
            changes.push(("full_name", SqlValue::String(required_text(Some(v.as_str()), "full_name")?)));
        }
        if let Some(v) = self.email {
            let email = required_text(Some(v.as_str()), "email")?.to_lowercase();
            changes.push(("email", SqlValue::String(email)));
        }
        if let Some(v) = self.national_id {
            changes.push(("national_id", SqlValue::String(required_text(Some(v.as_str()), "national_id")?)));
        }
        if let Some(role) = self.role {
            changes.push(("role", SqlValue::String(role.as_ref().to_string())));
        }
        if let Some(v) = self.phone {
            changes.push(("phone", optional_text(Some(v.as_str())).map_or(SqlValue::Null, SqlValue::String)));
        }
        if let Some(v) = self.position {
            changes.push(("position", optional_text(Some(v.as_str())).map_or(SqlValue::Null, SqlValue::String)));
        }
        if let Some(v) = self.supervisor_id {
            changes.push(("supervisor_id", v.map_or(SqlValue::Null, SqlValue::U64)));
        }
        if let Some(v) = self.vacation_days_balance {
            changes.push(("vacation_days_balance", SqlValue::U32(v)));
        }
        if let Some(v) = self.administrative_days_balance {
            changes.push(("administrative_days_balance", SqlValue::U32(v)));
        }
        if let Some(v) = self.is_active {
            changes.push(("is_active", SqlValue::Bool(v)));
        }
        if let Some(v) = self.password {
            if v.is_empty() {
                return Err(bad_request("password cannot be empty"));
            }
            let hashed = hash_password(&v).map_err(|e| {
                error!(error = %e, "Failed to hash password");
                internal_error()
            })?;
            changes.push(("password", SqlValue::String(hashed)));
        }

        Ok(changes)
    }
}

#[derive(Deserialize, IntoParams)]
pub struct UserQuery {
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    /// Items per page, at most 100
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct UserListResponse {
    pub data: Vec<User>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

fn duplicate_or_internal(e: sqlx::Error) -> actix_web::Error {
    if is_unique_violation(&e) {
        json_error(StatusCode::CONFLICT, "Email or national id already registered")
    } else {
        error!(error = %e, "Failed to write user");
        internal_error()
    }
}

async fn fetch_user(pool: &MySqlPool, user_id: u64) -> Result<Option<User>, actix_web::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, user_id, "Failed to fetch user");
            internal_error()
        })
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    params(UserQuery),
    responses(
        (status = 200, description = "Users ordered by name", body = UserListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<UserQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageUsers)?;

    let (page, per_page, offset) = page_window(query.page, query.per_page);

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to count users");
            internal_error()
        })?;

    let data = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users ORDER BY full_name ASC LIMIT ? OFFSET ?"
    ))
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list users");
        internal_error()
    })?;

    Ok(HttpResponse::Ok().json(UserListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Missing required field"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Email or national id already registered", body = Object, example = json!({
            "message": "Email or national id already registered"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageUsers)?;

    let new = payload.into_inner().validate()?;

    let taken: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE email = ? OR national_id = ?",
    )
    .bind(&new.email)
    .bind(&new.national_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to check user uniqueness");
        internal_error()
    })?;

    if taken > 0 {
        return Err(json_error(StatusCode::CONFLICT, "Email or national id already registered"));
    }

    let hashed = hash_password(&new.password).map_err(|e| {
        error!(error = %e, "Failed to hash password");
        internal_error()
    })?;

    // The unique keys still catch a concurrent insert of the same email.
    let result = sqlx::query(
        r#"
        INSERT INTO users
            (full_name, email, password, role, national_id, phone, position,
             supervisor_id, vacation_days_balance, administrative_days_balance)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.full_name)
    .bind(&new.email)
    .bind(hashed)
    .bind(new.role.as_ref())
    .bind(&new.national_id)
    .bind(&new.phone)
    .bind(&new.position)
    .bind(new.supervisor_id)
    .bind(new.vacation_days_balance)
    .bind(new.administrative_days_balance)
    .execute(pool.get_ref())
    .await
    .map_err(duplicate_or_internal)?;

    let user_id = result.last_insert_id();
    info!(user_id, created_by = auth.user_id, role = %new.role, "User created");

    match fetch_user(pool.get_ref(), user_id).await? {
        Some(user) => Ok(HttpResponse::Created().json(user)),
        None => Err(internal_error()),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = u64, Path, description = "User ID")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "No fields provided for update"),
        (status = 403, description = "Forbidden, including self-demotion"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Email or national id already registered")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<UpdateUser>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageUsers)?;

    let user_id = path.into_inner();
    let payload = payload.into_inner();
    payload.check_self_edit(&auth, user_id)?;

    if fetch_user(pool.get_ref(), user_id).await?.is_none() {
        return Ok(HttpResponse::NotFound().json(json!({"message": "User not found"})));
    }

    let ends_sessions = payload.ends_sessions();
    let update = build_update_sql("users", payload.into_changes()?, "id", user_id)?;

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, user_id, "Failed to begin transaction");
        internal_error()
    })?;

    execute_update(&mut *tx, update)
        .await
        .map_err(duplicate_or_internal)?;

    if ends_sessions {
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                error!(error = %e, user_id, "Failed to revoke refresh tokens");
                internal_error()
            })?;
    }

    tx.commit().await.map_err(|e| {
        error!(error = %e, user_id, "Failed to commit user update");
        internal_error()
    })?;

    info!(user_id, updated_by = auth.user_id, sessions_revoked = ends_sessions, "User updated");

    match fetch_user(pool.get_ref(), user_id).await? {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Ok(HttpResponse::NotFound().json(json!({"message": "User not found"}))),
    }
}

/// Soft delete: the account is kept for leave history but can no longer log in.
#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = u64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deactivated", body = Object, example = json!({
            "message": "User deactivated"
        })),
        (status = 403, description = "Forbidden, including deactivating yourself"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn deactivate_user(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageUsers)?;

    let user_id = path.into_inner();
    if user_id == auth.user_id {
        return Err(json_error(StatusCode::FORBIDDEN, "You cannot deactivate yourself"));
    }

    if fetch_user(pool.get_ref(), user_id).await?.is_none() {
        return Ok(HttpResponse::NotFound().json(json!({"message": "User not found"})));
    }

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, user_id, "Failed to begin transaction");
        internal_error()
    })?;

    let deactivated = async {
        sqlx::query("UPDATE users SET is_active = FALSE WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        Ok::<_, sqlx::Error>(())
    }
    .await;

    if let Err(e) = deactivated {
        error!(error = %e, user_id, "Failed to deactivate user");
        return Err(internal_error());
    }

    tx.commit().await.map_err(|e| {
        error!(error = %e, user_id, "Failed to commit deactivation");
        internal_error()
    })?;

    info!(user_id, deactivated_by = auth.user_id, "User deactivated");
    Ok(HttpResponse::Ok().json(json!({"message": "User deactivated"})))
}
