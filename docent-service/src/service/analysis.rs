//! Synchronous and background document analysis.

use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::{ProcessingError, ServiceError, ServiceResult, format_error_chain};
use crate::ingestion::is_supported_filename;
use crate::pipeline::{AnalysisRequest, AnalysisResult, NoopProgress};
use crate::service::DocentService;
use crate::tasks::TaskProgress;

/// A document received from a client, before validation
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub content: Bytes,
    /// Model override; the configured default is used when absent
    pub model: Option<String>,
    pub instruction: Option<String>,
}

/// Handle to a background analysis
pub struct StartedAnalysis {
    pub task_id: String,
    pub handle: JoinHandle<()>,
}

impl DocentService {
    /// Validate an upload and resolve the model to use
    pub fn prepare_request(&self, upload: UploadedDocument) -> ServiceResult<AnalysisRequest> {
        if !is_supported_filename(&upload.filename) {
            return Err(ProcessingError::UnsupportedFormat {
                filename: upload.filename,
            }
            .into());
        }

        let max_size = self.config.limits.max_document_size_bytes;
        let size = upload.content.len() as u64;
        if size > max_size {
            return Err(ProcessingError::FileTooLarge {
                size,
                max: max_size,
            }
            .into());
        }
        if size == 0 {
            return Err(ServiceError::InvalidRequest {
                message: "uploaded file is empty".to_string(),
            });
        }

        let model = upload
            .model
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.config.ollama.default_model.clone());
        let instruction = upload.instruction.filter(|i| !i.trim().is_empty());

        Ok(AnalysisRequest {
            filename: upload.filename,
            content: upload.content,
            model,
            instruction,
        })
    }

    /// Analyze a document inline. No task is registered.
    pub async fn analyze_document(&self, upload: UploadedDocument) -> ServiceResult<AnalysisResult> {
        let request = self.prepare_request(upload)?;
        info!(filename = %request.filename, model = %request.model, "Starting inline analysis");
        self.pipeline.run(&request, &NoopProgress).await
    }

    /// Register a task and analyze the document in the background.
    ///
    /// Validation errors are returned before any task is created.
    pub fn start_analysis(
        self: &Arc<Self>,
        upload: UploadedDocument,
    ) -> ServiceResult<StartedAnalysis> {
        let request = self.prepare_request(upload)?;
        let task_id = self.tasks.create(&request.filename, &request.model);
        let token = self.tasks.cancellation_token(&task_id)?;

        let service = self.clone();
        let id = task_id.clone();
        let handle = tokio::spawn(async move {
            let sink = TaskProgress::new(service.tasks.clone(), id.clone(), token);
            match service.pipeline.run(&request, &sink).await {
                Ok(mut result) => {
                    result.task_id = Some(id.clone());
                    service.tasks.complete(&id, result);
                }
                Err(e) if e.is_cancellation() => {
                    info!(task_id = %id, "Analysis stopped after cancellation");
                }
                Err(e) => {
                    if !service.tasks.fail(&id, format_error_chain(&e)) {
                        warn!(task_id = %id, error = %e, "Analysis failed after task finished");
                    }
                }
            }
        });

        Ok(StartedAnalysis { task_id, handle })
    }
}
