//! Scripted adapters and fixtures shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, mpsc};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;

use crate::config::ServiceConfig;
use crate::error::{ExtractionError, OllamaError};
use crate::ingestion::{DocumentExtractor, ExtractedDocument, ImagePosition, PageImage, PageRecord};
use crate::ollama::OllamaClient;
use crate::pipeline::{AnalysisRequest, ProgressSink};
use crate::service::{DocentService, UploadedDocument};
use crate::vision::AnalysisModel;

pub const TEST_MODEL: &str = "test-model";

pub fn text_page(page_number: usize, text: &str) -> PageRecord {
    PageRecord {
        page_number,
        text: text.to_string(),
        tables: Vec::new(),
        images: Vec::new(),
    }
}

/// A page with `images` embedded images whose payloads read `image 1`, `image 2`, ...
pub fn image_page(page_number: usize, text: &str, images: usize) -> PageRecord {
    let mut page = text_page(page_number, text);
    page.images = (1..=images)
        .map(|n| PageImage {
            png: Bytes::from(format!("image {}", n)),
            position: ImagePosition::default(),
        })
        .collect();
    page
}

pub fn request(filename: &str) -> AnalysisRequest {
    AnalysisRequest {
        filename: filename.to_string(),
        content: Bytes::from_static(b"%PDF-1.7 test"),
        model: TEST_MODEL.to_string(),
        instruction: None,
    }
}

pub fn upload(filename: &str) -> UploadedDocument {
    UploadedDocument {
        filename: filename.to_string(),
        content: Bytes::from_static(b"%PDF-1.7 test"),
        model: None,
        instruction: None,
    }
}

pub fn service_with(extractor: FakeExtractor, model: FakeModel) -> Arc<DocentService> {
    service_with_config(ServiceConfig::default(), extractor, model)
}

pub fn service_with_config(
    config: ServiceConfig,
    extractor: FakeExtractor,
    model: FakeModel,
) -> Arc<DocentService> {
    let ollama = Arc::new(OllamaClient::new(config.ollama.clone()).unwrap());
    Arc::new(DocentService::with_components(
        config,
        ollama,
        Arc::new(extractor),
        Arc::new(model),
    ))
}

/// Extractor returning fixed pages, optionally blocking until released
pub struct FakeExtractor {
    pages: Vec<PageRecord>,
    fail: bool,
    gate: Option<Mutex<mpsc::Receiver<()>>>,
}

impl FakeExtractor {
    pub fn with_pages(pages: Vec<PageRecord>) -> Self {
        Self {
            pages,
            fail: false,
            gate: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::with_pages(Vec::new())
        }
    }

    /// Block extraction until the returned sender fires (or is dropped)
    pub fn gated(mut self) -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        self.gate = Some(Mutex::new(rx));
        (self, tx)
    }
}

impl DocumentExtractor for FakeExtractor {
    fn extract(&self, _content: &[u8]) -> Result<ExtractedDocument, ExtractionError> {
        if let Some(gate) = &self.gate {
            let _ = gate.lock().unwrap().recv();
        }
        if self.fail {
            return Err(ExtractionError::InvalidDocument {
                message: "not a PDF".to_string(),
            });
        }
        Ok(ExtractedDocument {
            page_count: self.pages.len(),
            pages: self.pages.clone(),
        })
    }
}

/// Model that echoes image payloads and counts pages in the summarized text
#[derive(Default)]
pub struct FakeModel {
    fail_images: bool,
    fail_summary: bool,
    summary_gate: Option<Arc<Notify>>,
    image_calls: Arc<AtomicUsize>,
    summary_calls: Arc<AtomicUsize>,
}

impl FakeModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_images(mut self) -> Self {
        self.fail_images = true;
        self
    }

    pub fn failing_summary(mut self) -> Self {
        self.fail_summary = true;
        self
    }

    /// Hold summarization until the returned notify fires
    pub fn gated_summary(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.summary_gate = Some(gate.clone());
        (self, gate)
    }

    pub fn image_calls(&self) -> Arc<AtomicUsize> {
        self.image_calls.clone()
    }

    pub fn summary_calls(&self) -> Arc<AtomicUsize> {
        self.summary_calls.clone()
    }
}

#[async_trait]
impl AnalysisModel for FakeModel {
    async fn describe_image(&self, _model: &str, png: &[u8]) -> Result<String, OllamaError> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_images {
            return Err(OllamaError::Generation {
                status: 500,
                message: "vision unavailable".to_string(),
            });
        }
        Ok(format!("description of {}", String::from_utf8_lossy(png)))
    }

    async fn summarize(
        &self,
        _model: &str,
        text: &str,
        _instruction: Option<&str>,
    ) -> Result<String, OllamaError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.summary_gate {
            gate.notified().await;
        }
        if self.fail_summary {
            return Err(OllamaError::Generation {
                status: 500,
                message: "model crashed".to_string(),
            });
        }
        Ok(format!("analysis of {} pages", text.matches("--- Page ").count()))
    }
}

/// Sink recording every update
#[derive(Default)]
pub struct RecordingProgress {
    updates: Mutex<Vec<(u8, String)>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<(u8, String)> {
        self.updates.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, progress: u8, step: &str) {
        self.updates
            .lock()
            .unwrap()
            .push((progress, step.to_string()));
    }

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Sink that reports cancellation once `n` checkpoints have passed
pub struct CancelAfter {
    remaining: AtomicUsize,
}

impl CancelAfter {
    pub fn checks(n: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(n),
        }
    }
}

impl ProgressSink for CancelAfter {
    fn report(&self, _progress: u8, _step: &str) {}

    fn is_cancelled(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
    }
}
