mod analysis;

pub use analysis::{StartedAnalysis, UploadedDocument};

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::ingestion::{DocumentExtractor, PdfExtractor};
use crate::items::ItemStore;
use crate::ollama::{ModelInfo, OllamaClient};
use crate::pipeline::AnalysisPipeline;
use crate::tasks::{Task, TaskRegistry};
use crate::vision::AnalysisModel;

/// Main service coordinator
pub struct DocentService {
    pub config: Arc<ServiceConfig>,
    pub ollama: Arc<OllamaClient>,
    pub pipeline: Arc<AnalysisPipeline>,
    pub tasks: Arc<TaskRegistry>,
    pub items: Arc<ItemStore>,
}

impl DocentService {
    /// Create a service backed by PDFium and Ollama
    pub async fn new(config: ServiceConfig) -> ServiceResult<Self> {
        info!("Initializing Docent service");

        let ollama = Arc::new(OllamaClient::new(config.ollama.clone())?);
        if ollama.health_check().await {
            info!(url = %ollama.base_url(), "Ollama is available");
        } else {
            warn!(url = %ollama.base_url(), "Ollama is not available");
        }

        let model: Arc<dyn AnalysisModel> = ollama.clone();
        Ok(Self::with_components(
            config,
            ollama,
            Arc::new(PdfExtractor::new()),
            model,
        ))
    }

    /// Assemble a service from its adapters
    pub fn with_components(
        config: ServiceConfig,
        ollama: Arc<OllamaClient>,
        extractor: Arc<dyn DocumentExtractor>,
        model: Arc<dyn AnalysisModel>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            ollama,
            pipeline: Arc::new(AnalysisPipeline::new(extractor, model)),
            tasks: Arc::new(TaskRegistry::new()),
            items: Arc::new(ItemStore::new()),
        }
    }

    /// Models available on the Ollama runtime
    pub async fn list_models(&self) -> ServiceResult<Vec<ModelInfo>> {
        self.ollama
            .list_models()
            .await
            .map_err(ServiceError::ModelsUnavailable)
    }

    pub fn get_task(&self, task_id: &str) -> ServiceResult<Task> {
        self.tasks.get(task_id)
    }

    pub fn list_tasks(&self) -> Vec<Task> {
        self.tasks.list()
    }

    pub fn cancel_task(&self, task_id: &str) -> ServiceResult<Task> {
        self.tasks.cancel(task_id)
    }

    pub fn delete_task(&self, task_id: &str) -> ServiceResult<()> {
        self.tasks.delete(task_id)
    }
}
