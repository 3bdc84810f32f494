use crate::auth::auth::AuthUser;
use crate::config::Config;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let auth_user = match AuthUser::from_bearer(header, &config.jwt_secret) {
        Ok(user) => user,
        Err(reason) => {
            tracing::debug!(path = %req.path(), reason, "Rejected unauthenticated request");
            let resp = HttpResponse::Unauthorized().json(json!({"message": reason}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}
