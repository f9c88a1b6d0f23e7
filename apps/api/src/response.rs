use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// JSON envelope shared by every endpoint:
/// `{ success, data?, error?, message?, details? }`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Debug rendering of the failure; only filled outside production.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        ApiResponse {
            success: true,
            data: Some(data),
            error: None,
            message: None,
            details: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        ApiResponse {
            success: true,
            data: None,
            error: None,
            message: Some(message.into()),
            details: None,
        }
    }

    pub fn failure(error: impl Into<String>, details: Option<String>) -> Self {
        ApiResponse {
            success: false,
            data: None,
            error: Some(error.into()),
            message: None,
            details,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
