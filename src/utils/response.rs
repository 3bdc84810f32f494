use actix_web::{HttpResponse, error::InternalError, http::StatusCode, web};
use serde_json::json;

/// Error whose response body is `{"message": ...}` like every other
/// error this service returns.
pub fn json_error(status: StatusCode, message: impl Into<String>) -> actix_web::Error {
    let message = message.into();
    let response = HttpResponse::build(status).json(json!({ "message": message }));
    InternalError::from_response(message, response).into()
}

pub fn bad_request(message: impl Into<String>) -> actix_web::Error {
    json_error(StatusCode::BAD_REQUEST, message)
}

pub fn internal_error() -> actix_web::Error {
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

/// Malformed JSON bodies (unknown enum values, bad dates) answer with a
/// `{"message"}` 400 instead of actix's plain-text body.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| bad_request(err.to_string()))
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| bad_request(err.to_string()))
}

/// Non-numeric ids in the path are a 400, not a plain-text 404.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| bad_request(err.to_string()))
}

/// Trimmed copy of a required text field, or a 400 naming it.
pub fn required_text(value: Option<&str>, field: &str) -> Result<String, actix_web::Error> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(bad_request(format!("{field} is required"))),
    }
}

/// Blank optional text is stored as NULL.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
