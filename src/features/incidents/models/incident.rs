use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;

/// Incident status enum matching database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "incident_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Pending,
    Published,
    Rejected,
    Deleted,
}

impl IncidentStatus {
    /// Whether owner edits are allowed for an incident in this state
    pub fn can_edit(self, is_published: bool) -> bool {
        self == IncidentStatus::Pending && !is_published
    }

    /// Terminal state written by a soft delete
    pub fn soft_delete_target() -> Self {
        IncidentStatus::Deleted
    }

    pub fn is_deleted(self) -> bool {
        self == IncidentStatus::Deleted
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentStatus::Pending => write!(f, "pending"),
            IncidentStatus::Published => write!(f, "published"),
            IncidentStatus::Rejected => write!(f, "rejected"),
            IncidentStatus::Deleted => write!(f, "deleted"),
        }
    }
}

/// Database model for incident
#[derive(Debug, Clone, FromRow)]
pub struct Incident {
    pub id: i64,
    pub owner_user_id: i64,
    /// Display identity, NULL for anonymous reports
    pub user_id: Option<i64>,
    pub page_url: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub anonymous: bool,
    pub status: IncidentStatus,
    pub assigned_admin_id: Option<i64>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Incident {
    pub fn can_edit(&self) -> bool {
        self.status.can_edit(self.is_published)
    }
}

/// Data for inserting an incident
#[derive(Debug, Clone)]
pub struct NewIncident {
    pub owner_id: i64,
    pub display_id: Option<i64>,
    pub page_url: Option<String>,
    pub description: Option<String>,
    pub anonymous: bool,
    pub status: IncidentStatus,
    pub assigned_handler_id: Option<i64>,
    pub is_published: bool,
}

impl NewIncident {
    /// A fresh unpublished, unassigned report owned by `owner_id`
    pub fn draft(
        owner_id: i64,
        page_url: Option<String>,
        description: Option<String>,
        anonymous: bool,
    ) -> Self {
        Self {
            owner_id,
            display_id: if anonymous { None } else { Some(owner_id) },
            page_url,
            description,
            anonymous,
            status: IncidentStatus::Pending,
            assigned_handler_id: None,
            is_published: false,
        }
    }
}

/// Owner-editable fields; `None` leaves the column untouched
#[derive(Debug, Clone, Default)]
pub struct IncidentFieldsPatch {
    pub page_url: Option<String>,
    pub description: Option<String>,
}

/// Owned incident with its first category and attachment count
#[derive(Debug, Clone, FromRow)]
pub struct OwnedIncidentRow {
    #[sqlx(flatten)]
    pub incident: Incident,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub attachment_count: i64,
}

/// Row of the owner's report list
#[derive(Debug, Clone, FromRow)]
pub struct IncidentSummaryRow {
    #[sqlx(flatten)]
    pub incident: Incident,
    pub category_name: Option<String>,
}

/// Pending workload of one active handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct HandlerLoad {
    pub handler_id: i64,
    pub pending_count: i64,
}
