use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::candidates::file_store::FileStoreError;
use crate::candidates::repository::RepositoryError;
use crate::candidates::validation::ValidationError;
use crate::response::ApiResponse;

/// Unredacted failure envelope, carried as a response extension so that
/// [`reveal_error_details`] can swap it in.
#[derive(Debug, Clone)]
struct DetailedFailure(ApiResponse<()>);

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Candidate {0} has no résumé on file")]
    ResumeMissing(i32),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] FileStoreError),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::DuplicateEmail(email) => {
                AppError::Conflict(format!("Email {email} is already registered"))
            }
            RepositoryError::Database(e) => AppError::Database(e),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) | AppError::ResumeMissing(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Builds the failure envelope. With `expose_details` off, internal
    /// failures get a generic message and no `details`.
    pub fn envelope(&self, expose_details: bool) -> (StatusCode, ApiResponse<()>) {
        let status = self.status();
        let message = if status.is_server_error() && !expose_details {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        let details = expose_details.then(|| format!("{self:?}"));
        (status, ApiResponse::failure(message, details))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {self:?}");
        } else {
            tracing::debug!("Request rejected ({status}): {self}");
        }

        let (status, body) = self.envelope(false);
        let (_, detailed) = self.envelope(true);
        let mut response = (status, body).into_response();
        response.extensions_mut().insert(DetailedFailure(detailed));
        response
    }
}

/// Middleware that replaces redacted error bodies with the full envelope
/// (real message plus `details`) when `expose` is set. Responses that did
/// not come from an [`AppError`] pass through untouched.
pub async fn reveal_error_details(
    State(expose): State<bool>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    if !expose {
        return response;
    }
    match response.extensions().get::<DetailedFailure>().cloned() {
        Some(DetailedFailure(body)) => (response.status(), body).into_response(),
        None => response,
    }
}
