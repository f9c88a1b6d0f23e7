//! Mock authentication boundary. Any non-empty bearer token is accepted;
//! no credentials are checked anywhere.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::response::ApiResponse;

pub const MOCK_TOKEN: &str = "mock-token-123";

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: &'static str,
}

/// Rejects requests without an `Authorization: Bearer <token>` header.
pub async fn require_bearer(request: Request, next: Next) -> Result<Response, AppError> {
    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let Some(token) = header_value.and_then(|value| value.strip_prefix("Bearer ")) else {
        return Err(AppError::Unauthorized(
            "Authentication token required".to_string(),
        ));
    };
    if token.trim().is_empty() {
        return Err(AppError::Unauthorized(
            "Invalid authentication token".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

/// POST /api/auth/login
/// Accepts any body and always hands out the same token.
pub async fn handle_login() -> ApiResponse<LoginResponse> {
    ApiResponse::ok(LoginResponse { token: MOCK_TOKEN }).with_message("Login successful")
}

/// POST /api/auth/logout
pub async fn handle_logout() -> ApiResponse<()> {
    ApiResponse::message("Logout successful")
}
