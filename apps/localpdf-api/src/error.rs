//! Error types for the LocalPDF API

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use localpdf_core::PdfToolError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Tool(#[from] PdfToolError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid form data: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Invalid request body: {}", .0.body_text())]
    Json(#[from] JsonRejection),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    status: u16,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Tool(PdfToolError::FileNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Tool(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Tool(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) | ApiError::Multipart(_) | ApiError::Json(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!("request failed: {}", self);
            format!("An error occurred while processing the PDF: {}", self)
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: message,
            status: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_mapping() {
        let missing = ApiError::from(PdfToolError::FileNotFound(PathBuf::from("a.pdf")));
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let range = ApiError::from(PdfToolError::InvalidRangeFormat("x".into()));
        assert_eq!(range.status(), StatusCode::BAD_REQUEST);

        let encrypted = ApiError::from(PdfToolError::EncryptedDocument("locked".into()));
        assert_eq!(encrypted.status(), StatusCode::BAD_REQUEST);

        let helper = ApiError::from(PdfToolError::SubprocessFailure("boom".into()));
        assert_eq!(helper.status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(ApiError::BadRequest("no".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_client_message_is_the_error_text() {
        let err = ApiError::from(PdfToolError::EncryptedDocument("This PDF is password-protected.".into()));
        assert_eq!(err.to_string(), "This PDF is password-protected.");
    }
}
