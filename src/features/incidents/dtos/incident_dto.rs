use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::features::incidents::models::{
    Attachment, Incident, IncidentStatus, IncidentSummaryRow, OwnedIncidentRow,
};
use crate::shared::validation::PAGE_URL_REGEX;

/// Content types accepted when creating a report (besides any `image/*`)
pub const EXTRA_REPORT_MIME_TYPES: &[&str] = &["application/pdf"];

/// Attachments may be any image or one of [`EXTRA_REPORT_MIME_TYPES`]
pub fn is_report_file_allowed(content_type: &str) -> bool {
    is_image(content_type) || EXTRA_REPORT_MIME_TYPES.contains(&content_type)
}

/// Cover replacements on update must be images
pub fn is_image(content_type: &str) -> bool {
    content_type
        .strip_prefix("image/")
        .is_some_and(|subtype| !subtype.is_empty())
}

// =============================================================================
// REQUEST DTOs
// =============================================================================

/// Create report form (multipart/form-data)
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler reads the fields with axum's Multipart extractor.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct CreateIncidentForm {
    #[schema(example = "https://shop.example/checkout")]
    pub page_url: Option<String>,
    pub description: Option<String>,
    /// "true"/"1"/"yes"/"on" hide the reporter from public listings
    pub anonymous: Option<String>,
    pub category_id: Option<i64>,
    /// Up to 8 images or PDF files
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub files: Option<Vec<String>>,
}

/// Update report form (multipart/form-data)
/// Note: This struct is for Swagger UI documentation only.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UpdateIncidentForm {
    pub page_url: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    /// Drop the current cover image when no new file is sent
    pub delete_attachment: Option<String>,
    /// Replacement cover image (field `file` or `files`)
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: Option<String>,
}

/// Parsed create form fields
#[derive(Debug, Clone, Default, Validate)]
pub struct CreateIncidentDto {
    #[validate(
        length(max = 2048, message = "page_url must not exceed 2048 characters"),
        regex(path = *PAGE_URL_REGEX, message = "page_url must be an http(s) URL")
    )]
    pub page_url: Option<String>,
    #[validate(length(max = 5000, message = "description must not exceed 5000 characters"))]
    pub description: Option<String>,
    pub anonymous: bool,
    #[validate(range(min = 1, message = "category_id must be a positive id"))]
    pub category_id: Option<i64>,
}

/// Parsed update form fields; absent fields are left unchanged
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateIncidentDto {
    #[validate(
        length(max = 2048, message = "page_url must not exceed 2048 characters"),
        regex(path = *PAGE_URL_REGEX, message = "page_url must be an http(s) URL")
    )]
    pub page_url: Option<String>,
    #[validate(length(max = 5000, message = "description must not exceed 5000 characters"))]
    pub description: Option<String>,
    #[validate(range(min = 1, message = "category_id must be a positive id"))]
    pub category_id: Option<i64>,
    pub delete_attachment: bool,
}

// =============================================================================
// RESPONSE DTOs
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachmentDto {
    pub id: i64,
    pub incident_id: i64,
    pub path: String,
    /// Public URL, `/` + path
    pub url: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<Attachment> for AttachmentDto {
    fn from(a: Attachment) -> Self {
        Self {
            url: a.url(),
            id: a.id,
            incident_id: a.incident_id,
            path: a.path,
            mime_type: a.mime_type,
            size_bytes: a.size_bytes,
            created_at: a.created_at,
        }
    }
}

/// Full incident as returned right after creation
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IncidentDetailDto {
    pub id: i64,
    pub owner_user_id: i64,
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
    pub attachments: Vec<AttachmentDto>,
}

impl IncidentDetailDto {
    pub fn new(incident: Incident, attachments: Vec<Attachment>) -> Self {
        Self {
            id: incident.id,
            owner_user_id: incident.owner_user_id,
            user_id: incident.user_id,
            page_url: incident.page_url,
            domain: incident.domain,
            description: incident.description,
            anonymous: incident.anonymous,
            status: incident.status,
            assigned_admin_id: incident.assigned_admin_id,
            is_published: incident.is_published,
            created_at: incident.created_at,
            updated_at: incident.updated_at,
            attachments: attachments.into_iter().map(AttachmentDto::from).collect(),
        }
    }
}

/// Owner view of one report
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OwnedIncidentDetailDto {
    pub id: i64,
    pub page_url: Option<String>,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub anonymous: bool,
    pub status: IncidentStatus,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub attachments_count: i64,
    /// Fields, category and cover can still be changed
    pub can_edit: bool,
    pub can_attach: bool,
}

impl From<OwnedIncidentRow> for OwnedIncidentDetailDto {
    fn from(row: OwnedIncidentRow) -> Self {
        let can_edit = row.incident.can_edit();
        let incident = row.incident;
        Self {
            id: incident.id,
            page_url: incident.page_url,
            domain: incident.domain,
            description: incident.description,
            anonymous: incident.anonymous,
            status: incident.status,
            is_published: incident.is_published,
            created_at: incident.created_at,
            updated_at: incident.updated_at,
            category_id: row.category_id,
            category_name: row.category_name,
            attachments_count: row.attachment_count,
            can_edit,
            can_attach: can_edit,
        }
    }
}

/// Row of the owner's report list
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IncidentSummaryDto {
    pub id: i64,
    pub status: IncidentStatus,
    pub description: Option<String>,
    pub domain: Option<String>,
    pub created_at: DateTime<Utc>,
    pub category: Option<String>,
}

impl From<IncidentSummaryRow> for IncidentSummaryDto {
    fn from(row: IncidentSummaryRow) -> Self {
        Self {
            id: row.incident.id,
            status: row.incident.status,
            description: row.incident.description,
            domain: row.incident.domain,
            created_at: row.incident.created_at,
            category: row.category_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incident(status: IncidentStatus, is_published: bool) -> Incident {
        Incident {
            id: 3,
            owner_user_id: 1,
            user_id: None,
            page_url: None,
            domain: None,
            description: None,
            anonymous: true,
            status,
            assigned_admin_id: None,
            is_published,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_mime_rules() {
        assert!(is_report_file_allowed("image/png"));
        assert!(is_report_file_allowed("application/pdf"));
        assert!(!is_report_file_allowed("text/html"));
        assert!(is_image("image/webp"));
        assert!(!is_image("image/"));
        assert!(!is_image("application/pdf"));
    }

    #[test]
    fn test_create_dto_validation() {
        let valid = CreateIncidentDto {
            page_url: Some("https://shop.example/x".to_string()),
            description: Some("fake store".to_string()),
            anonymous: false,
            category_id: Some(2),
        };
        assert!(valid.validate().is_ok());

        let bad_url = CreateIncidentDto {
            page_url: Some("shop.example".to_string()),
            ..valid.clone()
        };
        assert!(bad_url.validate().is_err());

        let bad_category = CreateIncidentDto {
            category_id: Some(0),
            ..valid
        };
        assert!(bad_category.validate().is_err());
    }

    #[test]
    fn test_owned_detail_flags_follow_window() {
        let row = |status, published| OwnedIncidentRow {
            incident: incident(status, published),
            category_id: None,
            category_name: None,
            attachment_count: 2,
        };

        let draft = OwnedIncidentDetailDto::from(row(IncidentStatus::Pending, false));
        assert!(draft.can_edit && draft.can_attach);
        assert_eq!(draft.attachments_count, 2);

        let published = OwnedIncidentDetailDto::from(row(IncidentStatus::Published, true));
        assert!(!published.can_edit && !published.can_attach);
    }

    #[test]
    fn test_attachment_url_is_rooted_path() {
        let dto = AttachmentDto::from(Attachment {
            id: 1,
            incident_id: 3,
            path: "public/uploads/a.png".to_string(),
            mime_type: None,
            size_bytes: None,
            created_at: Utc::now(),
        });
        assert_eq!(dto.url, "/public/uploads/a.png");
    }
}
