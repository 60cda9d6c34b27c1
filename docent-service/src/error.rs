use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::tasks::TaskStatus;

/// Main service error type
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("Task {task_id} cannot be cancelled (status: {status})")]
    TaskNotCancellable { task_id: String, status: TaskStatus },

    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: u64 },

    #[error("{0}")]
    Ollama(#[from] OllamaError),

    #[error("Failed to list models")]
    ModelsUnavailable(#[source] OllamaError),

    #[error("{0}")]
    Extraction(#[from] ExtractionError),

    #[error("{0}")]
    Processing(#[from] ProcessingError),

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Ollama client errors
#[derive(Error, Debug)]
pub enum OllamaError {
    #[error("Connection failed to Ollama at {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Model not found: {model}")]
    ModelNotFound { model: String },

    #[error("Generation failed (status {status}): {message}")]
    Generation { status: u16, message: String },

    #[error("Invalid response from Ollama")]
    InvalidResponse {
        #[source]
        source: reqwest::Error,
    },
}

/// Document parsing errors raised by the extraction adapter
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to load PDFium library: {message}")]
    LibraryUnavailable { message: String },

    #[error("Failed to open document: {message}")]
    InvalidDocument { message: String },

    #[error("Failed to extract text from page {page}: {message}")]
    PageText { page: usize, message: String },
}

/// Pipeline and upload processing errors
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Analysis was cancelled")]
    Cancelled,

    #[error("Unsupported file format: {filename} (only PDF files are accepted)")]
    UnsupportedFormat { filename: String },

    #[error("No text could be extracted from the document")]
    NoTextExtracted,

    #[error("File too large: {size} bytes (max {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Upload exceeds the maximum document size of {max} bytes")]
    UploadTooLarge { max: u64 },

    #[error("Extraction worker failed")]
    Worker(#[source] tokio::task::JoinError),
}

/// API error response (matches Axum's built-in JsonRejection format)
#[derive(Serialize)]
pub struct ErrorResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::TaskNotFound { .. } | ServiceError::ItemNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            ServiceError::TaskNotCancellable { .. }
            | ServiceError::InvalidRequest { .. }
            | ServiceError::Ollama(_)
            | ServiceError::Extraction(_) => StatusCode::BAD_REQUEST,
            ServiceError::Processing(
                ProcessingError::FileTooLarge { .. } | ProcessingError::UploadTooLarge { .. },
            ) => StatusCode::PAYLOAD_TOO_LARGE,
            ServiceError::Processing(ProcessingError::Worker(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Processing(_) => StatusCode::BAD_REQUEST,
            ServiceError::ModelsUnavailable(_)
            | ServiceError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            ServiceError::TaskNotFound { .. } => "task_not_found",
            ServiceError::TaskNotCancellable { .. } => "task_not_cancellable",
            ServiceError::ItemNotFound { .. } => "item_not_found",
            ServiceError::Ollama(OllamaError::Connection { .. }) => "ollama_connection",
            ServiceError::Ollama(OllamaError::ModelNotFound { .. }) => "ollama_model_not_found",
            ServiceError::Ollama(OllamaError::Generation { .. }) => "ollama_generation",
            ServiceError::Ollama(OllamaError::InvalidResponse { .. }) => "ollama_invalid_response",
            ServiceError::ModelsUnavailable(_) => "models_unavailable",
            ServiceError::Extraction(_) => "extraction_error",
            ServiceError::Processing(ProcessingError::Cancelled) => "cancelled",
            ServiceError::Processing(ProcessingError::UnsupportedFormat { .. }) => {
                "unsupported_format"
            }
            ServiceError::Processing(ProcessingError::NoTextExtracted) => "no_text_extracted",
            ServiceError::Processing(
                ProcessingError::FileTooLarge { .. } | ProcessingError::UploadTooLarge { .. },
            ) => "file_too_large",
            ServiceError::Processing(ProcessingError::Worker(_)) => "worker_error",
            ServiceError::InvalidRequest { .. } => "invalid_request",
            ServiceError::Config { .. } => "config_error",
        }
    }

    /// Whether this error is the cooperative cancellation outcome rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ServiceError::Processing(ProcessingError::Cancelled))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code().to_string();

        let response = ErrorResponse {
            message: format_error_chain(&self),
            code: Some(code),
        };

        (status, Json(response)).into_response()
    }
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Render an error and all of its sources as a single `a: b: c` line.
pub fn format_error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.ends_with(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
