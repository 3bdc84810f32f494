use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    model::role::Role,
    model::user::{Profile, UserCredentials},
    models::{Claims, LoginReqDto, TokenPair, TokenType},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issues an access/refresh pair and records the refresh `jti`.
async fn issue_tokens(
    pool: &MySqlPool,
    config: &Config,
    user_id: u64,
    email: &str,
    role: Role,
) -> Result<TokenPair, HttpResponse> {
    let access_token =
        generate_access_token(user_id, email, role, &config.jwt_secret, config.access_token_ttl)
            .map_err(|e| {
                error!(error = %e, user_id, "Failed to sign access token");
                HttpResponse::InternalServerError().finish()
            })?;

    let (refresh_token, refresh_claims) =
        generate_refresh_token(user_id, email, role, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(|e| {
                error!(error = %e, user_id, "Failed to sign refresh token");
                HttpResponse::InternalServerError().finish()
            })?;

    debug!(user_id, jti = %refresh_claims.jti, "Storing refresh token");

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool)
    .await
    .map_err(|e| {
        error!(error = %e, user_id, "Failed to store refresh token");
        HttpResponse::InternalServerError().finish()
    })?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        role,
    })
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = TokenPair),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(email = %user.email)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return HttpResponse::BadRequest().json(json!({"message": "Email and password required"}));
    }

    let db_user = match sqlx::query_as::<_, UserCredentials>(
        r#"
        SELECT id, email, password, role, is_active
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(user.email.trim())
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(found)) => found,
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().json(json!({"message": "Invalid credentials"}));
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if !db_user.is_active {
        info!(user_id = db_user.id, "Login refused: account deactivated");
        return HttpResponse::Unauthorized().json(json!({"message": "Invalid credentials"}));
    }

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().json(json!({"message": "Invalid credentials"}));
    }

    let Some(role) = db_user.role() else {
        error!(user_id = db_user.id, role = %db_user.role, "Stored role is not recognised");
        return HttpResponse::InternalServerError().finish();
    };

    let pair = match issue_tokens(pool.get_ref(), &config, db_user.id, &db_user.email, role).await {
        Ok(pair) => pair,
        Err(resp) => return resp,
    };

    // Non-fatal
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");
    HttpResponse::Ok().json(pair)
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::Unauthorized().json(json!({"message": "Missing refresh token"}));
    };

    let claims: Claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::Unauthorized().finish(),
    };

    // Revoke and rotate in one step so a token can be redeemed only once.
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = ? AND revoked = FALSE AND expires_at > NOW()
        "#,
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await;

    match revoked {
        Ok(res) if res.rows_affected() == 1 => {}
        Ok(_) => {
            info!(user_id = claims.user_id, "Refresh token unknown or already revoked");
            return HttpResponse::Unauthorized().finish();
        }
        Err(e) => {
            error!(error = %e, "Failed to revoke refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    }

    // The new pair carries the role stored now, not the one in the old token.
    let db_user = match sqlx::query_as::<_, UserCredentials>(
        r#"
        SELECT id, email, password, role, is_active
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(claims.user_id)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(found) => found,
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let Some((db_user, role)) = db_user.and_then(|u| u.session_role().map(|role| (u, role))) else {
        info!(user_id = claims.user_id, "Refresh refused: account missing or deactivated");
        return HttpResponse::Unauthorized().finish();
    };

    if role != claims.role {
        info!(user_id = db_user.id, from = %claims.role, to = %role, "Role changed since last refresh");
    }

    match issue_tokens(pool.get_ref(), &config, db_user.id, &db_user.email, role).await {
        Ok(pair) => HttpResponse::Ok().json(pair),
        Err(resp) => resp,
    }
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked (idempotent)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token on logout");
    }

    HttpResponse::NoContent().finish()
}

#[utoipa::path(
    get,
    path = "/api/v1/me",
    responses(
        (status = 200, description = "Current user with leave balances", body = Profile),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User no longer exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let profile = sqlx::query_as::<_, Profile>(
        r#"
        SELECT id, full_name, email, role, position,
               vacation_days_balance, administrative_days_balance
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(auth.user_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, user_id = auth.user_id, "Failed to fetch profile");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    match profile {
        Some(p) => Ok(HttpResponse::Ok().json(p)),
        None => Ok(HttpResponse::NotFound().json(json!({"message": "User not found"}))),
    }
}
