use crate::{
    auth::auth::AuthUser,
    model::event::{EVENT_COLUMNS, Event},
    model::role::Capability,
    utils::event_cache,
    utils::response::{bad_request, internal_error, optional_text, required_text},
};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateEvent {
    #[schema(example = "Independence Day")]
    pub title: Option<String>,
    pub description: Option<String>,
    #[schema(example = "2025-09-18", format = "date", value_type = Option<String>)]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2025-09-19", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    #[schema(example = true)]
    pub is_holiday: Option<bool>,
}

#[derive(Debug, PartialEq)]
struct NewEvent {
    title: String,
    description: Option<String>,
    start_date: NaiveDate,
    end_date: Option<NaiveDate>,
    is_holiday: bool,
}

impl CreateEvent {
    fn validate(self) -> Result<NewEvent, actix_web::Error> {
        let title = required_text(self.title.as_deref(), "title")?;
        let start_date = self
            .start_date
            .ok_or_else(|| bad_request("start_date is required"))?;
        if self.end_date.is_some_and(|end| end < start_date) {
            return Err(bad_request("end_date cannot be before start_date"));
        }

        Ok(NewEvent {
            title,
            description: optional_text(self.description.as_deref()),
            start_date,
            end_date: self.end_date,
            is_holiday: self.is_holiday.unwrap_or(false),
        })
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/events",
    responses(
        (status = 200, description = "Events ordered by start date", body = [Event]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn list_events(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
) -> actix_web::Result<impl Responder> {
    let events = event_cache::cached_events(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to list events");
            internal_error()
        })?;

    Ok(HttpResponse::Ok().json(events.as_ref()))
}

#[utoipa::path(
    post,
    path = "/api/v1/events",
    request_body = CreateEvent,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Missing title/start_date or end_date before start_date"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn create_event(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEvent>,
) -> actix_web::Result<impl Responder> {
    auth.require(Capability::ManageEvents)?;

    let new = payload.into_inner().validate()?;

    let result = sqlx::query(
        r#"
        INSERT INTO events (title, description, start_date, end_date, is_holiday)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&new.title)
    .bind(&new.description)
    .bind(new.start_date)
    .bind(new.end_date)
    .bind(new.is_holiday)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to create event");
        internal_error()
    })?;

    event_cache::invalidate().await;

    let id = result.last_insert_id();
    info!(event_id = id, created_by = auth.user_id, "Event created");

    let created = sqlx::query_as::<_, Event>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"))
        .bind(id)
        .fetch_one(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, event_id = id, "Failed to reload event");
            internal_error()
        })?;

    Ok(HttpResponse::Created().json(created))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn single_day_event_defaults_to_not_a_holiday() {
        let new = CreateEvent {
            title: Some("Staff meeting".into()),
            start_date: Some(date("2025-10-06")),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert!(!new.is_holiday);
        assert_eq!(new.end_date, None);
    }

    #[test]
    fn title_and_start_are_required() {
        let no_title = CreateEvent {
            start_date: Some(date("2025-10-06")),
            ..Default::default()
        };
        assert!(no_title.validate().is_err());

        let no_start = CreateEvent {
            title: Some("Staff meeting".into()),
            ..Default::default()
        };
        assert!(no_start.validate().is_err());
    }

    #[test]
    fn end_before_start_is_rejected() {
        let reversed = CreateEvent {
            title: Some("Holidays".into()),
            start_date: Some(date("2025-12-31")),
            end_date: Some(date("2025-12-24")),
            ..Default::default()
        };
        assert!(reversed.validate().is_err());
    }
}
