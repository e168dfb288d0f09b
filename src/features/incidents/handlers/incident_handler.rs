use axum::{
    extract::{multipart::Field, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

use crate::core::config::StorageConfig;
use crate::core::error::AppError;
use crate::features::auth::guards::{principal_of, RequirePrincipal};
use crate::features::auth::model::AuthenticatedUser;
use crate::features::incidents::dtos::{
    is_image, is_report_file_allowed, CreateIncidentDto, CreateIncidentForm, IncidentDetailDto,
    IncidentSummaryDto, OwnedIncidentDetailDto, UpdateIncidentDto, UpdateIncidentForm,
};
use crate::features::incidents::models::NewAttachment;
use crate::features::incidents::services::IncidentService;
use crate::modules::storage::StoredFile;
use crate::shared::types::{ApiResponse, Meta};
use crate::shared::validation::parse_form_bool;

/// State for report handlers
#[derive(Clone)]
pub struct ReportState {
    pub service: Arc<IncidentService>,
    pub limits: StorageConfig,
}

/// File read from the request, not yet written to storage
struct PendingUpload {
    data: Vec<u8>,
    content_type: String,
}

struct CreateForm {
    dto: CreateIncidentDto,
    files: Vec<PendingUpload>,
}

struct UpdateForm {
    dto: UpdateIncidentDto,
    file: Option<PendingUpload>,
}

/// Create a report
///
/// Accepts multipart/form-data with `page_url`, `description`, `anonymous`,
/// `category_id` and up to 8 `files` (images or PDF).
#[utoipa::path(
    post,
    path = "/api/reports",
    tag = "reports",
    request_body(
        content = CreateIncidentForm,
        content_type = "multipart/form-data",
        description = "Report fields with optional image or PDF attachments",
    ),
    responses(
        (status = 201, description = "Report created", body = ApiResponse<IncidentDetailDto>),
        (status = 400, description = "Invalid field or file"),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Caller has no registered account")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_report(
    user: AuthenticatedUser,
    State(state): State<ReportState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<IncidentDetailDto>>), AppError> {
    let owner_id = principal_of(&user)?;
    let form = read_create_form(multipart, &state.limits).await?;

    form.dto
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    // From here on the service owns the stored files and removes them if
    // nothing commits
    let stored = store_uploads(&state.service, form.files).await?;
    let attachments: Vec<NewAttachment> = stored.into_iter().map(NewAttachment::from).collect();

    let detail = state
        .service
        .create_incident(Some(owner_id), form.dto, attachments)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(detail),
            Some("Report created".to_string()),
            None,
        )),
    ))
}

/// List the caller's reports, newest first
#[utoipa::path(
    get,
    path = "/api/reports",
    tag = "reports",
    responses(
        (status = 200, description = "Owned reports", body = ApiResponse<Vec<IncidentSummaryDto>>),
        (status = 401, description = "Authentication required"),
        (status = 403, description = "Caller has no registered account")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn list_my_reports(
    RequirePrincipal(owner_id): RequirePrincipal,
    State(state): State<ReportState>,
) -> Result<Json<ApiResponse<Vec<IncidentSummaryDto>>>, AppError> {
    let reports = state.service.list_owned(owner_id).await?;
    let total = reports.len() as i64;

    Ok(Json(ApiResponse::success(
        Some(reports),
        None,
        Some(Meta { total }),
    )))
}

/// Get one of the caller's reports
#[utoipa::path(
    get,
    path = "/api/reports/{id}",
    tag = "reports",
    params(
        ("id" = i64, Path, description = "Report ID")
    ),
    responses(
        (status = 200, description = "Report detail", body = ApiResponse<OwnedIncidentDetailDto>),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Report not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_my_report(
    RequirePrincipal(owner_id): RequirePrincipal,
    State(state): State<ReportState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OwnedIncidentDetailDto>>, AppError> {
    let detail = state.service.get_owned_detail(owner_id, id).await?;
    Ok(Json(ApiResponse::success(Some(detail), None, None)))
}

/// Edit a report that is still a draft
///
/// Absent or blank fields are left unchanged. A `file` (or `files`) image
/// replaces the cover; `delete_attachment=true` without a file drops it.
#[utoipa::path(
    patch,
    path = "/api/reports/{id}",
    tag = "reports",
    params(
        ("id" = i64, Path, description = "Report ID")
    ),
    request_body(
        content = UpdateIncidentForm,
        content_type = "multipart/form-data",
        description = "Fields to change and an optional replacement cover image",
    ),
    responses(
        (status = 200, description = "Report updated", body = ApiResponse<OwnedIncidentDetailDto>),
        (status = 400, description = "Invalid field or file"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Report not found"),
        (status = 409, description = "Report can no longer be edited")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn update_my_report(
    RequirePrincipal(owner_id): RequirePrincipal,
    State(state): State<ReportState>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<OwnedIncidentDetailDto>>, AppError> {
    let form = read_update_form(multipart, &state.limits).await?;

    form.dto
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let stored = store_uploads(&state.service, form.file.into_iter().collect()).await?;
    let cover = stored.into_iter().next().map(NewAttachment::from);

    let detail = state
        .service
        .update_incident(owner_id, id, form.dto, cover)
        .await?;

    Ok(Json(ApiResponse::success(
        Some(detail),
        Some("Report updated".to_string()),
        None,
    )))
}

/// Soft-delete one of the caller's reports
#[utoipa::path(
    delete,
    path = "/api/reports/{id}",
    tag = "reports",
    params(
        ("id" = i64, Path, description = "Report ID")
    ),
    responses(
        (status = 204, description = "Report deleted"),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Report not found")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn delete_my_report(
    RequirePrincipal(owner_id): RequirePrincipal,
    State(state): State<ReportState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.service.delete_incident(owner_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// MULTIPART INTAKE
// =============================================================================

async fn read_create_form(
    mut multipart: Multipart,
    limits: &StorageConfig,
) -> Result<CreateForm, AppError> {
    let mut dto = CreateIncidentDto::default();
    let mut files = Vec::new();

    while let Some(field) = next_field(&mut multipart).await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "files" => {
                if files.len() >= limits.max_files_per_report {
                    return Err(AppError::BadRequest(format!(
                        "At most {} files can be attached to a report",
                        limits.max_files_per_report
                    )));
                }
                let upload = read_upload(field, limits.max_file_size).await?;
                if !is_report_file_allowed(&upload.content_type) {
                    return Err(AppError::BadRequest(format!(
                        "File type '{}' is not allowed. Attach images or PDF files",
                        upload.content_type
                    )));
                }
                files.push(upload);
            }
            "page_url" => dto.page_url = read_text(field).await?,
            "description" => dto.description = read_text(field).await?,
            "anonymous" => dto.anonymous = read_bool(field).await?,
            "category_id" => dto.category_id = read_id(field).await?,
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    Ok(CreateForm { dto, files })
}

async fn read_update_form(
    mut multipart: Multipart,
    limits: &StorageConfig,
) -> Result<UpdateForm, AppError> {
    let mut dto = UpdateIncidentDto::default();
    let mut file = None;

    while let Some(field) = next_field(&mut multipart).await? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" | "files" => {
                if file.is_some() {
                    return Err(AppError::BadRequest(
                        "Only one cover image can be uploaded".to_string(),
                    ));
                }
                let upload = read_upload(field, limits.max_file_size).await?;
                if !is_image(&upload.content_type) {
                    return Err(AppError::BadRequest(format!(
                        "File type '{}' is not allowed. The cover must be an image",
                        upload.content_type
                    )));
                }
                file = Some(upload);
            }
            "page_url" => dto.page_url = read_text(field).await?,
            "description" => dto.description = read_text(field).await?,
            "category_id" => dto.category_id = read_id(field).await?,
            "delete_attachment" => dto.delete_attachment = read_bool(field).await?,
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    Ok(UpdateForm { dto, file })
}

async fn next_field(multipart: &mut Multipart) -> Result<Option<Field<'_>>, AppError> {
    multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })
}

async fn read_upload(field: Field<'_>, max_file_size: usize) -> Result<PendingUpload, AppError> {
    let content_type = field
        .content_type()
        .map(|s| s.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let data = field.bytes().await.map_err(|e| {
        debug!("Failed to read file bytes: {}", e);
        AppError::BadRequest(format!("Failed to read file data: {}", e))
    })?;

    if data.len() > max_file_size {
        return Err(AppError::BadRequest(format!(
            "File too large. Maximum size is {} bytes ({} MB)",
            max_file_size,
            max_file_size / 1024 / 1024
        )));
    }

    Ok(PendingUpload {
        data: data.to_vec(),
        content_type,
    })
}

/// Text field; blank values count as absent
async fn read_text(field: Field<'_>) -> Result<Option<String>, AppError> {
    let name = field.name().unwrap_or("").to_string();
    let text = field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read {} field: {}", name, e)))?;

    let trimmed = text.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

async fn read_bool(field: Field<'_>) -> Result<bool, AppError> {
    let name = field.name().unwrap_or("").to_string();
    let text = read_text(field).await?.unwrap_or_default();
    parse_form_bool(&text)
        .ok_or_else(|| AppError::Validation(format!("{} must be a boolean", name)))
}

async fn read_id(field: Field<'_>) -> Result<Option<i64>, AppError> {
    let name = field.name().unwrap_or("").to_string();
    read_text(field)
        .await?
        .map(|text| {
            text.parse::<i64>()
                .map_err(|_| AppError::Validation(format!("{} must be a number", name)))
        })
        .transpose()
}

/// Write pending uploads; on failure the files already written are removed
async fn store_uploads(
    service: &IncidentService,
    uploads: Vec<PendingUpload>,
) -> Result<Vec<StoredFile>, AppError> {
    let mut stored = Vec::with_capacity(uploads.len());

    for upload in uploads {
        match service
            .attachments()
            .store(upload.data, &upload.content_type)
            .await
        {
            Ok(file) => stored.push(file),
            Err(e) => {
                let paths: Vec<String> = stored.iter().map(|f| f.path.clone()).collect();
                service.attachments().discard_uploads(&paths).await;
                return Err(e);
            }
        }
    }

    Ok(stored)
}
