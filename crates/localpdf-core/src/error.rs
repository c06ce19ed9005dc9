use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfToolError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Missing required argument: {0}")]
    MissingArgument(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid page range format: {0}")]
    InvalidRangeFormat(String),

    #[error("Page {page} in '{token}' is out of range (1-{total})")]
    PageOutOfRange { token: String, page: u32, total: u32 },

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("{0}")]
    EncryptedDocument(String),

    #[error("External tool failed: {0}")]
    SubprocessFailure(String),

    #[error("Failed to process PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to build archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Failed to process image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PdfToolError {
    /// True for errors caused by the caller's input rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PdfToolError::MissingArgument(_)
                | PdfToolError::InvalidArgument(_)
                | PdfToolError::InvalidRangeFormat(_)
                | PdfToolError::PageOutOfRange { .. }
                | PdfToolError::InvalidOperation(_)
                | PdfToolError::EncryptedDocument(_)
        )
    }
}

pub type Result<T, E = PdfToolError> = std::result::Result<T, E>;
