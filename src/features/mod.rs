pub mod auth;
pub mod incidents;
pub mod public_reports;
