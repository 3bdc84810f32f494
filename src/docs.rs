use crate::api::announcement::CreateAnnouncement;
use crate::api::document::CreateDocument;
use crate::api::event::CreateEvent;
use crate::api::leave_request::{DecideLeave, LeaveFilter, LeaveListResponse, LeaveResponse};
use crate::api::medical_leave::{MedicalLeaveListResponse, RegisterMedicalLeave};
use crate::api::user::{CreateUser, UpdateUser, UserListResponse};
use crate::model::announcement::Announcement;
use crate::model::document::Document;
use crate::model::event::Event;
use crate::model::leave_request::{LeaveStatus, LeaveType};
use crate::model::medical_leave::MedicalLeave;
use crate::model::role::Role;
use crate::model::user::{Profile, User};
use crate::models::{LoginReqDto, TokenPair};
use crate::workflow::{DecisionAction, SubmitLeave};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Clinic Intranet API",
        version = "1.0.0",
        description = r#"
## Clinic Intranet

Backend for the staff intranet of a health clinic.

### Key Features
- **Leave Requests**
  - Staff submit vacation or administrative-day requests
  - Two-step review: the supervisor forwards, direction approves and the day balance is debited
- **Users**
  - Staff directory with roles, supervisors and day balances
- **Medical Leave**
  - Register of medical certificates per staff member
- **Board**
  - Announcements, shared documents and the events calendar

### Security
Every endpoint outside `/auth` requires a **JWT Bearer** access token.
What a caller may do is decided by their role.

### Response Format
- JSON bodies, errors as `{"message": "..."}`
- Pagination on leave, user and medical-leave lists
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::decide_leave,

        crate::api::user::list_users,
        crate::api::user::create_user,
        crate::api::user::update_user,
        crate::api::user::deactivate_user,

        crate::api::medical_leave::register_medical_leave,
        crate::api::medical_leave::list_medical_leave,

        crate::api::announcement::list_announcements,
        crate::api::announcement::create_announcement,

        crate::api::document::list_documents,
        crate::api::document::create_document,

        crate::api::event::list_events,
        crate::api::event::create_event
    ),
    components(
        schemas(
            LoginReqDto,
            TokenPair,
            Profile,
            Role,
            LeaveType,
            LeaveStatus,
            SubmitLeave,
            DecisionAction,
            DecideLeave,
            LeaveFilter,
            LeaveResponse,
            LeaveListResponse,
            User,
            CreateUser,
            UpdateUser,
            UserListResponse,
            MedicalLeave,
            RegisterMedicalLeave,
            MedicalLeaveListResponse,
            Announcement,
            CreateAnnouncement,
            Document,
            CreateDocument,
            Event,
            CreateEvent
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token refresh and current user"),
        (name = "Leave", description = "Leave request workflow"),
        (name = "Users", description = "Staff directory"),
        (name = "Medical leave", description = "Medical leave register"),
        (name = "Announcements", description = "Announcements board"),
        (name = "Documents", description = "Shared documents"),
        (name = "Events", description = "Events calendar"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_registers_bearer_scheme_and_leave_paths() {
        let doc = ApiDoc::openapi();

        let components = doc.components.as_ref().unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(doc.paths.paths.contains_key("/api/v1/leave/{leave_id}"));
        assert!(doc.paths.paths.contains_key("/auth/login"));
    }
}
