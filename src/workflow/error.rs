use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::model::leave_request::LeaveType;

#[derive(Debug, Display)]
pub enum LeaveError {
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "Not allowed to {}", _0)]
    Forbidden(&'static str),

    #[display(fmt = "Leave request not found")]
    NotFound,

    #[display(fmt = "{}", _0)]
    Conflict(String),

    #[display(fmt = "Insufficient {} balance: {} days requested", balance, requested)]
    InsufficientBalance { balance: &'static str, requested: u32 },

    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl LeaveError {
    pub fn insufficient_balance(leave_type: LeaveType, requested: u32) -> Self {
        let balance = match leave_type {
            LeaveType::Vacation => "vacation",
            LeaveType::Administrative => "administrative",
        };
        LeaveError::InsufficientBalance { balance, requested }
    }
}

impl std::error::Error for LeaveError {}

impl From<sqlx::Error> for LeaveError {
    fn from(e: sqlx::Error) -> Self {
        tracing::error!(error = %e, "Leave store failure");
        LeaveError::Internal
    }
}

impl ResponseError for LeaveError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeaveError::Validation(_) | LeaveError::InsufficientBalance { .. } => {
                StatusCode::BAD_REQUEST
            }
            LeaveError::Forbidden(_) => StatusCode::FORBIDDEN,
            LeaveError::NotFound => StatusCode::NOT_FOUND,
            LeaveError::Conflict(_) => StatusCode::CONFLICT,
            LeaveError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}
