use crate::config::Config;
use crate::model::role::{Capability, Role};
use crate::models::{Claims, TokenType};
use crate::workflow::Caller;
use crate::utils::response::{internal_error, json_error};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, http::StatusCode, web::Data};
use futures::future::{Ready, ready};

use super::jwt::verify_token;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    /// Validates a bearer header value into the caller it identifies.
    /// Only access tokens are accepted here.
    pub fn from_bearer(header: Option<&str>, secret: &str) -> Result<Self, &'static str> {
        let token = header
            .ok_or("Missing Authorization header")?
            .strip_prefix("Bearer ")
            .ok_or("Authorization header must start with Bearer")?;

        let claims: Claims = verify_token(token, secret).map_err(|_| "Invalid or expired token")?;
        if claims.token_type != TokenType::Access {
            return Err("Access token required");
        }

        Ok(AuthUser {
            user_id: claims.user_id,
            email: claims.sub,
            role: claims.role,
        })
    }
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already verified by the auth middleware on protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let Some(config) = req.app_data::<Data<Config>>() else {
            tracing::error!("Config missing from app data");
            return ready(Err(internal_error()));
        };

        let header = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok());

        ready(
            AuthUser::from_bearer(header, &config.jwt_secret)
                .map_err(|reason| json_error(StatusCode::UNAUTHORIZED, reason)),
        )
    }
}

impl AuthUser {
    pub fn require(&self, capability: Capability) -> actix_web::Result<()> {
        if self.role.can(capability) {
            Ok(())
        } else {
            tracing::debug!(user_id = self.user_id, role = %self.role, ?capability, "Capability denied");
            Err(json_error(StatusCode::FORBIDDEN, "Insufficient permissions"))
        }
    }

    pub fn caller(&self) -> Caller {
        Caller {
            id: self.user_id,
            role: self.role,
        }
    }
}
