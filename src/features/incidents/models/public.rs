use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::shared::constants::ANONYMOUS_REPORTER;

/// Published incident as exposed by the public catalog
#[derive(Debug, Clone, FromRow)]
pub struct PublicIncidentRow {
    pub id: i64,
    pub page_url: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub anonymous: bool,
    /// Name of the display identity, NULL when anonymous or unknown
    pub user_name: Option<String>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    /// First image (or untyped) attachment by ascending id
    pub cover_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PublicIncidentRow {
    pub fn reporter_name(&self) -> String {
        match (&self.user_name, self.anonymous) {
            (Some(name), false) => name.clone(),
            _ => ANONYMOUS_REPORTER.to_string(),
        }
    }
}

/// One row of the published domain ranking
#[derive(Debug, Clone, FromRow)]
pub struct DomainRankingRow {
    pub domain: String,
    pub reports: i64,
    pub top_category_id: Option<i64>,
    pub top_category_name: Option<String>,
    pub last_report_at: Option<DateTime<Utc>>,
    pub cover_path: Option<String>,
}
