mod attachment;
mod incident;
mod public;

pub use attachment::{Attachment, NewAttachment};
pub use incident::{
    HandlerLoad, Incident, IncidentFieldsPatch, IncidentStatus, IncidentSummaryRow, NewIncident,
    OwnedIncidentRow,
};
pub use public::{DomainRankingRow, PublicIncidentRow};
