use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database model for attachment
#[derive(Debug, Clone, FromRow)]
pub struct Attachment {
    pub id: i64,
    pub incident_id: i64,
    /// Path relative to the working directory, e.g. `public/uploads/<name>`
    pub path: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Attachment {
    /// Public URL of the stored file
    pub fn url(&self) -> String {
        format!("/{}", self.path.trim_start_matches('/'))
    }
}

/// Data for inserting an attachment row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub path: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
}

impl From<crate::modules::storage::StoredFile> for NewAttachment {
    fn from(file: crate::modules::storage::StoredFile) -> Self {
        Self {
            path: file.path,
            mime_type: file.mime_type,
            size_bytes: file.size_bytes,
        }
    }
}
