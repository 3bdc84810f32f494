use crate::{
    auth::auth::AuthUser,
    model::announcement::{ANNOUNCEMENT_SELECT, Announcement},
    model::role::Capability,
    utils::response::{internal_error, required_text},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAnnouncement {
    #[schema(example = "Flu vaccination campaign")]
    pub title: Option<String>,
    #[schema(example = "Vaccines are available at the nursing station from Monday.")]
    pub content: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/announcements",
    responses(
        (status = 200, description = "Announcements, newest first", body = [Announcement]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Announcements"
)]
pub async fn list_announcements(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let data = sqlx::query_as::<_, Announcement>(&format!(
        "{ANNOUNCEMENT_SELECT} ORDER BY a.created_at DESC, a.id DESC"
    ))
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list announcements");
        internal_error()
    })?;

    Ok(HttpResponse::Ok().json(data))
}

#[utoipa::path(
    post,
    path = "/api/v1/announcements",
    request_body = CreateAnnouncement,
    responses(
        (status = 201, description = "Announcement published", body = Announcement),
        (status = 400, description = "Title or content missing"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Announcements"
)]
pub async fn create_announcement(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateAnnouncement>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::PublishAnnouncement)?;

    let title = required_text(payload.title.as_deref(), "title")?;
    let content = required_text(payload.content.as_deref(), "content")?;

    let result = sqlx::query("INSERT INTO announcements (title, content, author_id) VALUES (?, ?, ?)")
        .bind(&title)
        .bind(&content)
        .bind(auth.user_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, author_id = auth.user_id, "Failed to publish announcement");
            internal_error()
        })?;

    let id = result.last_insert_id();
    info!(announcement_id = id, author_id = auth.user_id, "Announcement published");

    let created = sqlx::query_as::<_, Announcement>(&format!("{ANNOUNCEMENT_SELECT} WHERE a.id = ?"))
        .bind(id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, announcement_id = id, "Failed to reload announcement");
            internal_error()
        })?;

    Ok(HttpResponse::Created().json(created))
}
