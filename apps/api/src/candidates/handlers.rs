use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::candidates::models::{
    CandidateList, CreateCandidateRequest, PageRequest, UpdateCandidateRequest, UploadedFile,
};
use crate::candidates::validation;
use crate::errors::AppError;
use crate::models::candidate::{CandidateAggregate, ResumeRef};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Multipart part carrying the résumé.
pub const RESUME_FIELD: &str = "cv";
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    #[serde(alias = "limit")]
    pub page_size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeletedCandidate {
    pub id: i32,
}

fn parse_id(raw: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| AppError::BadRequest(format!("Invalid candidate id '{raw}'")))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// POST /api/candidates
pub async fn handle_create(
    State(state): State<AppState>,
    payload: Result<Json<CreateCandidateRequest>, JsonRejection>,
) -> Result<(StatusCode, ApiResponse<CandidateAggregate>), AppError> {
    let request = json_body(payload)?;
    let created = state.candidates.create(request).await?;
    Ok((StatusCode::CREATED, ApiResponse::ok(created)))
}

/// GET /api/candidates?page=&pageSize=
///
/// A query string that cannot be read at all (repeated keys, or both
/// `pageSize` and `limit`) falls back to the default page.
pub async fn handle_list(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<ApiResponse<CandidateList>, AppError> {
    let query = query.map(|Query(query)| query).unwrap_or_else(|rejection| {
        debug!("Ignoring unreadable list query: {}", rejection.body_text());
        ListQuery::default()
    });
    let request = PageRequest::from_query(query.page.as_deref(), query.page_size.as_deref());
    let list = state.candidates.list(request).await?;
    Ok(ApiResponse::ok(list))
}

/// GET /api/candidates/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<CandidateAggregate>, AppError> {
    let candidate = state.candidates.get_by_id(parse_id(&id)?).await?;
    Ok(ApiResponse::ok(candidate))
}

/// PUT /api/candidates/:id
pub async fn handle_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateCandidateRequest>, JsonRejection>,
) -> Result<ApiResponse<CandidateAggregate>, AppError> {
    let id = parse_id(&id)?;
    let request = json_body(payload)?;
    let updated = state.candidates.update(id, request).await?;
    Ok(ApiResponse::ok(updated))
}

/// DELETE /api/candidates/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<DeletedCandidate>, AppError> {
    let snapshot = state.candidates.delete(parse_id(&id)?).await?;
    Ok(ApiResponse::ok(DeletedCandidate {
        id: snapshot.candidate.id,
    })
    .with_message("Candidate deleted successfully"))
}

/// POST /api/candidates/:id/cv (multipart, part `cv`)
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ApiResponse<ResumeRef>, AppError> {
    let id = parse_id(&id)?;
    let mut multipart = multipart.map_err(|rejection| {
        AppError::BadRequest(format!("Upload failed: {}", rejection.body_text()))
    })?;
    let file = read_resume_part(&mut multipart)
        .await?
        .ok_or_else(|| AppError::BadRequest("No file was provided".to_string()))?;
    let stored = state.candidates.attach_resume(id, file).await?;
    Ok(ApiResponse::ok(stored))
}

/// GET /api/candidates/:id/cv
pub async fn handle_download_resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let file = state.candidates.fetch_resume(parse_id(&id)?).await?;
    let disposition = format!("attachment; filename=\"{}\"", file.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, file.mime_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

async fn read_resume_part(multipart: &mut Multipart) -> Result<Option<UploadedFile>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_string();
        let mime_type = field.content_type().unwrap_or(OCTET_STREAM).to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some(UploadedFile {
            original_name,
            mime_type,
            bytes,
        }));
    }
    Ok(None)
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::Validation(validation::too_large())
    } else {
        AppError::BadRequest(format!("Upload failed: {}", err.body_text()))
    }
}
