use std::sync::Arc;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::incidents::dtos::{
    CreateIncidentDto, IncidentDetailDto, IncidentSummaryDto, OwnedIncidentDetailDto,
    UpdateIncidentDto,
};
use crate::features::incidents::models::{
    Incident, IncidentFieldsPatch, NewAttachment, NewIncident,
};
use crate::features::incidents::services::{
    AssignmentPolicy, AttachmentManager, IncidentStore, TransactionError,
};
use crate::modules::storage::AttachmentStorage;

/// Report lifecycle: create, edit while in draft, soft delete, owner reads
///
/// Every mutation runs in one transaction. Files replaced by an edit are
/// unlinked only after that transaction committed.
pub struct IncidentService {
    store: IncidentStore,
    attachments: AttachmentManager,
}

impl IncidentService {
    pub fn new(store: IncidentStore, storage: Arc<dyn AttachmentStorage>) -> Self {
        Self {
            store,
            attachments: AttachmentManager::new(storage),
        }
    }

    pub fn attachments(&self) -> &AttachmentManager {
        &self.attachments
    }

    /// Create a report in draft and route it to a handler
    ///
    /// The incident, its category, its attachments and the assignment are
    /// written atomically. `files` are already in storage; they are removed
    /// again when nothing was committed.
    pub async fn create_incident(
        &self,
        principal_id: Option<i64>,
        dto: CreateIncidentDto,
        files: Vec<NewAttachment>,
    ) -> Result<IncidentDetailDto> {
        let upload_paths: Vec<String> = files.iter().map(|f| f.path.clone()).collect();

        let owner_id = match creatable_by(principal_id, &dto) {
            Ok(owner_id) => owner_id,
            Err(e) => {
                self.attachments.discard_uploads(&upload_paths).await;
                return Err(e);
            }
        };

        let new = NewIncident::draft(owner_id, dto.page_url, dto.description, dto.anonymous);
        let category_ids: Vec<i64> = dto.category_id.into_iter().collect();

        let outcome = self
            .store
            .run_in_transaction(move |conn| {
                Box::pin(async move {
                    let id = IncidentStore::insert_incident(&mut *conn, &new).await?;
                    IncidentStore::insert_categories(&mut *conn, id, &category_ids).await?;
                    AttachmentManager::bind_uploads(&mut *conn, id, &files).await?;
                    AssignmentPolicy::assign_new_incident(&mut *conn, id).await?;

                    let incident = IncidentStore::find_by_id(&mut *conn, id)
                        .await?
                        .ok_or_else(|| {
                            AppError::Internal(format!("Incident {} missing after insert", id))
                        })?;
                    let attachments = IncidentStore::list_attachments(&mut *conn, id).await?;
                    Ok(IncidentDetailDto::new(incident, attachments))
                })
            })
            .await;

        let detail = self.settle_uploads(outcome, &upload_paths).await?;
        tracing::info!("Created incident {} for owner {}", detail.id, owner_id);

        Ok(detail)
    }

    /// Edit an owned report while it is still a draft
    ///
    /// `new_cover` replaces every cover image; without it, `delete_attachment`
    /// drops them. The returned detail is read inside the transaction, so a
    /// committed edit is never reported as a failure.
    pub async fn update_incident(
        &self,
        owner_id: i64,
        incident_id: i64,
        dto: UpdateIncidentDto,
        new_cover: Option<NewAttachment>,
    ) -> Result<OwnedIncidentDetailDto> {
        let upload_paths: Vec<String> = new_cover.iter().map(|f| f.path.clone()).collect();

        if let Err(e) = dto.validate() {
            self.attachments.discard_uploads(&upload_paths).await;
            return Err(AppError::Validation(e.to_string()));
        }

        let patch = IncidentFieldsPatch {
            page_url: dto.page_url,
            description: dto.description,
        };
        let category_id = dto.category_id;
        let delete_cover = dto.delete_attachment;

        let outcome = self
            .store
            .run_in_transaction(move |conn| {
                Box::pin(async move {
                    if !IncidentStore::update_owned_fields(&mut *conn, owner_id, incident_id, &patch)
                        .await?
                    {
                        let current = IncidentStore::find_by_id(&mut *conn, incident_id).await?;
                        return Err(rejected_update_error(current.as_ref(), owner_id));
                    }

                    if let Some(category_id) = category_id {
                        IncidentStore::replace_categories_for_incident(
                            &mut *conn,
                            incident_id,
                            &[category_id],
                        )
                        .await?;
                    }

                    let unlink_paths = AttachmentManager::replace_cover(
                        &mut *conn,
                        owner_id,
                        incident_id,
                        new_cover,
                        delete_cover,
                    )
                    .await?;

                    let detail = IncidentStore::find_owned_detail(&mut *conn, owner_id, incident_id)
                        .await?
                        .ok_or_else(report_not_found)?;
                    Ok((OwnedIncidentDetailDto::from(detail), unlink_paths))
                })
            })
            .await;

        let (detail, unlink_paths) = self.settle_uploads(outcome, &upload_paths).await?;
        tracing::info!("Updated incident {} for owner {}", incident_id, owner_id);
        self.attachments.unlink_after_commit(&unlink_paths).await;

        Ok(detail)
    }

    /// Remove this request's uploads unless their rows may have been committed
    async fn settle_uploads<T>(
        &self,
        outcome: std::result::Result<T, TransactionError>,
        upload_paths: &[String],
    ) -> Result<T> {
        match outcome {
            Ok(value) => Ok(value),
            Err(err) if err.is_rolled_back() => {
                self.attachments.discard_uploads(upload_paths).await;
                Err(err.into())
            }
            Err(err) => {
                if !upload_paths.is_empty() {
                    tracing::warn!(
                        "Keeping {} upload(s) after an uncertain commit",
                        upload_paths.len()
                    );
                }
                Err(err.into())
            }
        }
    }

    /// Soft-delete an owned report
    pub async fn delete_incident(&self, owner_id: i64, incident_id: i64) -> Result<()> {
        self.store
            .run_in_transaction(move |conn| {
                Box::pin(async move {
                    IncidentStore::find_owned_for_update_locked(&mut *conn, owner_id, incident_id)
                        .await?
                        .ok_or_else(report_not_found)?;

                    if !IncidentStore::soft_delete(&mut *conn, owner_id, incident_id).await? {
                        return Err(AppError::Conflict(
                            "The report could not be deleted".to_string(),
                        ));
                    }
                    Ok(())
                })
            })
            .await?;

        tracing::info!("Soft-deleted incident {} for owner {}", incident_id, owner_id);
        Ok(())
    }

    pub async fn get_owned_detail(
        &self,
        owner_id: i64,
        incident_id: i64,
    ) -> Result<OwnedIncidentDetailDto> {
        IncidentStore::find_owned_detail(self.store.pool(), owner_id, incident_id)
            .await?
            .map(OwnedIncidentDetailDto::from)
            .ok_or_else(report_not_found)
    }

    pub async fn list_owned(&self, owner_id: i64) -> Result<Vec<IncidentSummaryDto>> {
        let rows = self.store.list_by_owner(owner_id).await?;
        Ok(rows.into_iter().map(IncidentSummaryDto::from).collect())
    }
}

/// Owner of a new report, once the request may create one
fn creatable_by(principal_id: Option<i64>, dto: &CreateIncidentDto) -> Result<i64> {
    let owner_id = principal_id
        .ok_or_else(|| AppError::Forbidden("You must sign in to create a report".to_string()))?;

    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    Ok(owner_id)
}

fn report_not_found() -> AppError {
    AppError::NotFound("Report does not exist or does not belong to you".to_string())
}

/// Explain why the gated update matched no row
///
/// Unknown, foreign and deleted reports are indistinguishable to the caller;
/// an owned report outside the editable window is a conflict.
fn rejected_update_error(current: Option<&Incident>, owner_id: i64) -> AppError {
    match current {
        Some(incident) if incident.owner_user_id == owner_id && !incident.status.is_deleted() => {
            AppError::Conflict("The report can no longer be edited".to_string())
        }
        _ => report_not_found(),
    }
}
