pub mod announcement;
pub mod document;
pub mod event;
pub mod leave_request;
pub mod medical_leave;
pub mod role;
pub mod user;
