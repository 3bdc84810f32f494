use crate::{
    api::{announcement, document, event, leave_request, medical_leave, user},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{Scope, middleware::from_fn, web};
use std::sync::Arc;

/// Per-route limiter allowing `requests_per_min` with an equal burst.
fn build_limiter(requests_per_min: u32) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {requests_per_min} per minute"))?;

    Ok(Governor::new(&cfg))
}

/// Limiters built once at startup and shared by every worker.
#[derive(Clone)]
pub struct Limiters {
    login: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    refresh: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    protected: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
}

impl Limiters {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)?),
            refresh: Arc::new(build_limiter(config.rate_refresh_per_min)?),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
        })
    }
}

pub fn leave_scope() -> Scope {
    web::scope("/leave")
        // /leave
        .service(
            web::resource("")
                .route(web::get().to(leave_request::leave_list))
                .route(web::post().to(leave_request::create_leave)),
        )
        // /leave/{id}
        .service(
            web::resource("/{id}")
                .route(web::get().to(leave_request::get_leave))
                .route(web::put().to(leave_request::decide_leave))
                .route(web::patch().to(leave_request::decide_leave)),
        )
}

fn user_scope() -> Scope {
    web::scope("/users")
        .service(
            web::resource("")
                .route(web::get().to(user::list_users))
                .route(web::post().to(user::create_user)),
        )
        .service(
            web::resource("/{id}")
                .route(web::put().to(user::update_user))
                .route(web::delete().to(user::deactivate_user)),
        )
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(limiters.protected.clone())
            .route("/me", web::get().to(handlers::me))
            .service(leave_scope())
            .service(user_scope())
            .service(
                web::resource("/medical-leave")
                    .route(web::get().to(medical_leave::list_medical_leave))
                    .route(web::post().to(medical_leave::register_medical_leave)),
            )
            .service(
                web::resource("/announcements")
                    .route(web::get().to(announcement::list_announcements))
                    .route(web::post().to(announcement::create_announcement)),
            )
            .service(
                web::resource("/documents")
                    .route(web::get().to(document::list_documents))
                    .route(web::post().to(document::create_document)),
            )
            .service(
                web::resource("/events")
                    .route(web::get().to(event::list_events))
                    .route(web::post().to(event::create_event)),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_accepts_zero_and_large_rates() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(60).is_ok());
        assert!(build_limiter(120_000).is_ok());
    }
}
