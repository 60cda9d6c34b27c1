//! Document analysis API handlers.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{ProcessingError, ServiceError};
use crate::pipeline::AnalysisResult;
use crate::service::UploadedDocument;
use crate::tasks::TaskStatus;

use super::AppState;

/// Response for a background analysis request
#[derive(Serialize)]
pub struct AsyncAnalysisResponse {
    pub task_id: String,
    pub status: TaskStatus,
    pub message: String,
}

/// Analyze a document and return the result inline
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<AnalysisResult>, ServiceError> {
    let upload = read_upload(multipart, &state).await?;
    let result = state.service.analyze_document(upload).await?;
    Ok(Json(result))
}

/// Start a background analysis and return its task id
pub async fn analyze_async_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<AsyncAnalysisResponse>, ServiceError> {
    let upload = read_upload(multipart, &state).await?;
    let filename = upload.filename.clone();
    let started = state.service.start_analysis(upload)?;

    Ok(Json(AsyncAnalysisResponse {
        task_id: started.task_id,
        status: TaskStatus::Processing,
        message: format!("Analysis of {} started", filename),
    }))
}

/// Collect the `file`, `model` and `custom_prompt` form fields
async fn read_upload(
    mut multipart: Multipart,
    state: &AppState,
) -> Result<UploadedDocument, ServiceError> {
    let max = state.service.config.limits.max_document_size_bytes;
    let rejected = |error: MultipartError| multipart_error(error, max);

    let mut file: Option<(bytes::Bytes, String)> = None;
    let mut model: Option<String> = None;
    let mut instruction: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(rejected)? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("document").to_string();
                let data = field.bytes().await.map_err(rejected)?;
                file = Some((data, filename));
            }
            "model" => {
                model = Some(field.text().await.map_err(rejected)?);
            }
            "custom_prompt" | "instruction" => {
                instruction = Some(field.text().await.map_err(rejected)?);
            }
            _ => {}
        }
    }

    let (content, filename) = file.ok_or_else(|| ServiceError::InvalidRequest {
        message: "No file provided".to_string(),
    })?;

    Ok(UploadedDocument {
        filename,
        content,
        model,
        instruction,
    })
}

/// Map a multipart read failure, keeping body-limit rejections as 413
fn multipart_error(error: MultipartError, max: u64) -> ServiceError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ProcessingError::UploadTooLarge { max }.into();
    }

    ServiceError::InvalidRequest {
        message: error.body_text(),
    }
}
