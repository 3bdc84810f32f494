pub mod error;
#[cfg(test)]
pub mod memory;
pub mod service;
pub mod state;
pub mod store;

pub use error::LeaveError;
pub use service::LeaveWorkflow;
pub use state::{Caller, DecisionAction, SubmitLeave};
pub use store::MySqlLeaveStore;
