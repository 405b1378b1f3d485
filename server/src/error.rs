//! Error type for the JSON endpoints

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Request body missing or malformed
    #[error("{0}")]
    BadRequest(String),

    /// Webhook call failed
    #[error("{0}")]
    Notification(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Notification(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        log::warn!("Request failed ({}): {}", status.as_u16(), self);

        let body = json!({
            "status": "error",
            "message": self.to_string(),
            "flash_messages": [],
        });
        (status, Json(body)).into_response()
    }
}
