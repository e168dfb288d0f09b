use sqlx::PgConnection;
use std::sync::Arc;

use crate::core::error::Result;
use crate::features::incidents::models::{Attachment, NewAttachment};
use crate::features::incidents::services::IncidentStore;
use crate::modules::storage::{AttachmentStorage, StoredFile};

/// Binds uploaded files to incidents and removes replaced files
///
/// Rows change inside the caller's transaction. Files are only touched after
/// the transaction committed, and a failed unlink leaves an orphan file
/// rather than failing the request.
pub struct AttachmentManager {
    storage: Arc<dyn AttachmentStorage>,
}

impl AttachmentManager {
    pub fn new(storage: Arc<dyn AttachmentStorage>) -> Self {
        Self { storage }
    }

    /// Write an upload to storage ahead of the transaction that records it
    pub async fn store(&self, data: Vec<u8>, content_type: &str) -> Result<StoredFile> {
        self.storage.save(data, content_type).await
    }

    /// Record freshly uploaded files against a new incident
    pub async fn bind_uploads(
        conn: &mut PgConnection,
        incident_id: i64,
        files: &[NewAttachment],
    ) -> Result<Vec<Attachment>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let rows = IncidentStore::insert_attachments(conn, incident_id, files).await?;
        tracing::debug!(
            "Bound {} attachment(s) to incident {}",
            rows.len(),
            incident_id
        );
        Ok(rows)
    }

    /// Swap or drop the cover image of an editable incident
    ///
    /// Every cover-kind row (image or untyped) is removed, so after a swap the
    /// new file is the only cover; documents are kept. Without `new_file` the
    /// cover is only dropped when `delete_current` is set. Returns the paths
    /// whose files must be unlinked once the transaction commits.
    pub async fn replace_cover(
        conn: &mut PgConnection,
        owner_id: i64,
        incident_id: i64,
        new_file: Option<NewAttachment>,
        delete_current: bool,
    ) -> Result<Vec<String>> {
        let mut unlink_paths = Vec::new();

        if new_file.is_none() && !delete_current {
            return Ok(unlink_paths);
        }

        let covers =
            IncidentStore::find_owned_cover_attachments(&mut *conn, owner_id, incident_id).await?;

        for cover in covers {
            let deleted =
                IncidentStore::delete_owned_attachment(&mut *conn, owner_id, incident_id, cover.id)
                    .await?;
            if deleted {
                unlink_paths.push(cover.path);
            }
        }

        if let Some(file) = new_file {
            IncidentStore::insert_attachments(conn, incident_id, std::slice::from_ref(&file))
                .await?;
        }

        Ok(unlink_paths)
    }

    /// Unlink files whose rows are gone; failures are logged and skipped
    pub async fn unlink_after_commit(&self, paths: &[String]) {
        for path in paths {
            match self.storage.remove(path).await {
                Ok(()) => tracing::info!("Removed replaced attachment file {}", path),
                Err(e) => tracing::warn!("Failed to remove attachment file {}: {}", path, e),
            }
        }
    }

    /// Remove uploads written for a request that did not commit
    pub async fn discard_uploads(&self, paths: &[String]) {
        self.unlink_after_commit(paths).await;
    }
}

#[cfg(test)]
pub(crate) mod test_storage {
    use async_trait::async_trait;
    use std::sync::Mutex;

    use crate::core::error::AppError;
    use crate::modules::storage::{AttachmentStorage, StoredFile};

    /// In-memory storage that records every call
    #[derive(Default)]
    pub struct RecordingStorage {
        pub fail_removals: bool,
        pub removed: Mutex<Vec<String>>,
        pub saved: Mutex<Vec<String>>,
    }

    impl RecordingStorage {
        pub fn failing() -> Self {
            Self {
                fail_removals: true,
                ..Self::default()
            }
        }

        pub fn removed(&self) -> Vec<String> {
            self.removed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AttachmentStorage for RecordingStorage {
        async fn save(&self, data: Vec<u8>, content_type: &str) -> Result<StoredFile, AppError> {
            let mut saved = self.saved.lock().unwrap();
            let path = format!("public/uploads/test-{}.bin", saved.len());
            saved.push(path.clone());
            Ok(StoredFile {
                path,
                mime_type: Some(content_type.to_string()),
                size_bytes: Some(data.len() as i64),
            })
        }

        async fn remove(&self, path: &str) -> Result<(), AppError> {
            if self.fail_removals {
                return Err(AppError::Internal("disk unavailable".to_string()));
            }
            self.removed.lock().unwrap().push(path.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_storage::RecordingStorage;
    use super::*;
    use crate::features::incidents::models::NewIncident;
    use crate::shared::test_helpers::{insert_user, publish};
    use sqlx::PgPool;

    fn image(path: &str) -> NewAttachment {
        NewAttachment {
            path: path.to_string(),
            mime_type: Some("image/png".to_string()),
            size_bytes: Some(4),
        }
    }

    #[tokio::test]
    async fn test_unlink_failures_are_swallowed() {
        let storage = Arc::new(RecordingStorage::failing());
        let manager = AttachmentManager::new(storage.clone());

        manager
            .unlink_after_commit(&["public/uploads/a.png".to_string()])
            .await;

        assert!(storage.removed().is_empty());
    }

    #[tokio::test]
    async fn test_discard_uploads_removes_every_file() {
        let storage = Arc::new(RecordingStorage::default());
        let manager = AttachmentManager::new(storage.clone());
        let first = storage.save(vec![1], "image/png").await.unwrap();
        let second = storage.save(vec![2], "application/pdf").await.unwrap();

        manager
            .discard_uploads(&[first.path.clone(), second.path.clone()])
            .await;

        assert_eq!(storage.removed(), vec![first.path, second.path]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_replace_cover_queues_old_path(pool: PgPool) {
        let owner = insert_user(&pool, false, true).await;
        let id = IncidentStore::insert_incident(&pool, &NewIncident::draft(owner, None, None, false))
            .await
            .unwrap();
        let mut conn = pool.acquire().await.unwrap();
        AttachmentManager::bind_uploads(&mut conn, id, &[image("public/uploads/old.png")])
            .await
            .unwrap();

        let queued = AttachmentManager::replace_cover(
            &mut conn,
            owner,
            id,
            Some(image("public/uploads/new.png")),
            false,
        )
        .await
        .unwrap();
        assert_eq!(queued, vec!["public/uploads/old.png".to_string()]);

        let paths: Vec<String> = IncidentStore::list_attachments(&mut *conn, id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.path)
            .collect();
        assert_eq!(paths, vec!["public/uploads/new.png".to_string()]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_replace_cover_swaps_every_image_and_keeps_documents(pool: PgPool) {
        let owner = insert_user(&pool, false, true).await;
        let id = IncidentStore::insert_incident(&pool, &NewIncident::draft(owner, None, None, false))
            .await
            .unwrap();
        let doc = NewAttachment {
            path: "public/uploads/doc.pdf".to_string(),
            mime_type: Some("application/pdf".to_string()),
            size_bytes: Some(9),
        };
        let mut conn = pool.acquire().await.unwrap();
        AttachmentManager::bind_uploads(
            &mut conn,
            id,
            &[image("public/uploads/a.png"), doc, image("public/uploads/b.png")],
        )
        .await
        .unwrap();

        let queued = AttachmentManager::replace_cover(
            &mut conn,
            owner,
            id,
            Some(image("public/uploads/new.png")),
            false,
        )
        .await
        .unwrap();
        assert_eq!(
            queued,
            vec!["public/uploads/a.png".to_string(), "public/uploads/b.png".to_string()]
        );

        let paths: Vec<String> = IncidentStore::list_attachments(&mut *conn, id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.path)
            .collect();
        assert_eq!(
            paths,
            vec!["public/uploads/doc.pdf".to_string(), "public/uploads/new.png".to_string()]
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_delete_flag_drops_cover(pool: PgPool) {
        let owner = insert_user(&pool, false, true).await;
        let id = IncidentStore::insert_incident(&pool, &NewIncident::draft(owner, None, None, false))
            .await
            .unwrap();
        let mut conn = pool.acquire().await.unwrap();
        AttachmentManager::bind_uploads(&mut conn, id, &[image("public/uploads/only.png")])
            .await
            .unwrap();

        let queued = AttachmentManager::replace_cover(&mut conn, owner, id, None, true)
            .await
            .unwrap();
        assert_eq!(queued, vec!["public/uploads/only.png".to_string()]);
        assert!(IncidentStore::list_attachments(&mut *conn, id)
            .await
            .unwrap()
            .is_empty());

        // nothing left to drop
        let queued = AttachmentManager::replace_cover(&mut conn, owner, id, None, true)
            .await
            .unwrap();
        assert!(queued.is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_published_cover_is_left_alone(pool: PgPool) {
        let owner = insert_user(&pool, false, true).await;
        let id = IncidentStore::insert_incident(&pool, &NewIncident::draft(owner, None, None, false))
            .await
            .unwrap();
        let mut conn = pool.acquire().await.unwrap();
        AttachmentManager::bind_uploads(&mut conn, id, &[image("public/uploads/keep.png")])
            .await
            .unwrap();
        publish(&pool, id).await;

        let queued = AttachmentManager::replace_cover(&mut conn, owner, id, None, true)
            .await
            .unwrap();
        assert!(queued.is_empty());
        assert_eq!(
            IncidentStore::list_attachments(&mut *conn, id)
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
