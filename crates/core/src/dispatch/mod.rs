//! Dispatch module
//!
//! Translates an inbound request into external commands and their outcome
//! into a response.

mod gateway;
mod request;
mod response;

pub use gateway::Gateway;
pub use request::{DispatchRequest, RequestEnvelope, RequestKind};
pub use response::{ResponseEnvelope, SubmissionStatus, JSON_CONTENT_TYPE};
