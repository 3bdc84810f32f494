use crate::{
    auth::auth::AuthUser,
    model::document::{DOCUMENT_SELECT, Document},
    model::role::Capability,
    utils::response::{internal_error, optional_text, required_text},
};
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

/// Metadata only; the file itself is uploaded to external storage first.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDocument {
    #[schema(example = "Triage protocol 2025")]
    pub title: Option<String>,
    #[schema(example = "https://storage.example/docs/triage-2025.pdf")]
    pub url: Option<String>,
    pub description: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/documents",
    responses(
        (status = 200, description = "Documents, newest first", body = [Document]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Documents"
)]
pub async fn list_documents(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let data = sqlx::query_as::<_, Document>(&format!(
        "{DOCUMENT_SELECT} ORDER BY d.created_at DESC, d.id DESC"
    ))
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to list documents");
        internal_error()
    })?;

    Ok(HttpResponse::Ok().json(data))
}

#[utoipa::path(
    post,
    path = "/api/v1/documents",
    request_body = CreateDocument,
    responses(
        (status = 201, description = "Document published", body = Document),
        (status = 400, description = "Title or url missing"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Documents"
)]
pub async fn create_document(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateDocument>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::PublishDocument)?;

    let title = required_text(payload.title.as_deref(), "title")?;
    let url = required_text(payload.url.as_deref(), "url")?;
    let description = optional_text(payload.description.as_deref());

    let result = sqlx::query(
        "INSERT INTO documents (title, url, description, creator_id) VALUES (?, ?, ?, ?)",
    )
    .bind(&title)
    .bind(&url)
    .bind(&description)
    .bind(auth.user_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, creator_id = auth.user_id, "Failed to publish document");
        internal_error()
    })?;

    let id = result.last_insert_id();
    info!(document_id = id, creator_id = auth.user_id, "Document published");

    let created = sqlx::query_as::<_, Document>(&format!("{DOCUMENT_SELECT} WHERE d.id = ?"))
        .bind(id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, document_id = id, "Failed to reload document");
            internal_error()
        })?;

    Ok(HttpResponse::Created().json(created))
}
