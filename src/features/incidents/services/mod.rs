pub mod assignment_policy;
pub mod attachment_manager;
pub mod incident_service;
pub mod incident_store;

pub use assignment_policy::{pick_least_loaded, AssignmentPolicy};
pub use attachment_manager::AttachmentManager;
pub use incident_service::IncidentService;
pub(crate) use incident_store::{public_incident_select, COVER_ATTACHMENT_FILTER};
pub use incident_store::{IncidentStore, TransactionError};
