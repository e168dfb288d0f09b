//! Local filesystem storage for report attachments
//!
//! Uploads are written as `<relative_dir>/<uuid v7>.<ext>` and removed only
//! after the owning transaction committed. Every path handed back for removal
//! must resolve to a strict descendant of the storage root.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::config::StorageConfig;
use crate::core::error::AppError;

/// Descriptor of a file written to storage, ready to become an attachment row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Path relative to the working directory, e.g. `public/uploads/<name>.jpg`
    pub path: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
}

/// Side-resource store for attachment files
#[async_trait]
pub trait AttachmentStorage: Send + Sync {
    /// Persist `data` and return the descriptor to record
    async fn save(&self, data: Vec<u8>, content_type: &str) -> Result<StoredFile, AppError>;

    /// Unlink a previously stored file
    ///
    /// Fails with `BadRequest` when `path` is not inside the storage root.
    async fn remove(&self, path: &str) -> Result<(), AppError>;
}

/// Attachment storage on the local filesystem
pub struct LocalStorage {
    root: PathBuf,
    relative_dir: String,
}

impl LocalStorage {
    pub fn new(config: &StorageConfig) -> Result<Self, AppError> {
        let root = config.storage_root().map_err(AppError::Internal)?;
        Ok(Self::with_root(root, config.uploads_relative_dir()))
    }

    /// Storage rooted at an explicit directory; stored paths are prefixed with
    /// `relative_dir`
    pub fn with_root(root: PathBuf, relative_dir: impl Into<String>) -> Self {
        Self {
            root,
            relative_dir: relative_dir.into().trim_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage root if it does not exist yet
    pub async fn ensure_root(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            AppError::Internal(format!(
                "Failed to create storage root {}: {}",
                self.root.display(),
                e
            ))
        })?;
        info!("Storage root ready at {}", self.root.display());
        Ok(())
    }

    /// Map a stored relative path onto the filesystem
    ///
    /// Returns `None` unless the path lives under `relative_dir` and names a
    /// strict descendant of the root using only plain components. A leading
    /// `/` (the public URL form) is accepted.
    pub fn resolve_safe(&self, stored_path: &str) -> Option<PathBuf> {
        let trimmed = stored_path.trim().trim_start_matches('/');
        let rest = trimmed
            .strip_prefix(&self.relative_dir)?
            .strip_prefix('/')?;

        let rest = Path::new(rest);
        let mut components = 0usize;
        for component in rest.components() {
            match component {
                Component::Normal(_) => components += 1,
                _ => return None,
            }
        }

        if components == 0 {
            return None;
        }

        Some(self.root.join(rest))
    }
}

#[async_trait]
impl AttachmentStorage for LocalStorage {
    async fn save(&self, data: Vec<u8>, content_type: &str) -> Result<StoredFile, AppError> {
        let size_bytes = data.len() as i64;
        let extension = extension_for(content_type);
        let file_name = format!("{}.{}", Uuid::now_v7(), extension);
        let target = self.root.join(&file_name);

        tokio::fs::write(&target, data).await.map_err(|e| {
            AppError::Internal(format!("Failed to write upload {}: {}", target.display(), e))
        })?;

        let path = format!("{}/{}", self.relative_dir, file_name);
        debug!("Stored upload at {} ({} bytes)", path, size_bytes);

        Ok(StoredFile {
            path,
            mime_type: Some(content_type.to_string()),
            size_bytes: Some(size_bytes),
        })
    }

    async fn remove(&self, path: &str) -> Result<(), AppError> {
        let target = self
            .resolve_safe(path)
            .ok_or_else(|| AppError::BadRequest(format!("Path outside storage root: {}", path)))?;

        tokio::fs::remove_file(&target).await.map_err(|e| {
            AppError::Internal(format!("Failed to remove {}: {}", target.display(), e))
        })?;

        debug!("Removed stored file {}", path);
        Ok(())
    }
}

/// File extension for an accepted upload content type
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "image/heic" => "heic",
        "image/svg+xml" => "svg",
        "application/pdf" => "pdf",
        _ => "bin",
    }
}
