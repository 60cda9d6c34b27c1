//! Document analysis pipeline.
//!
//! One run extracts every page, describes every embedded image, and asks the
//! model for a whole-document analysis:
//! - extraction happens once, on a blocking worker thread
//! - progress moves through 10 (loaded), 10-90 (pages and images), 100 (done)
//! - cancellation is checked before every page, every image, and the final
//!   summarization; it never interrupts an adapter call that is in flight
//! - a failed image description is noted inline and the run continues

mod progress;
mod render;

pub use progress::{NoopProgress, ProgressSink};

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ProcessingError, ServiceResult, format_error_chain};
use crate::ingestion::DocumentExtractor;
use crate::vision::AnalysisModel;

use progress::{
    COMPLETE_PROGRESS, EXTRACTED_PROGRESS, LOADED_PROGRESS, checkpoint, page_progress,
};
use render::DocumentText;

/// Input for one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub filename: String,
    pub content: Bytes,
    pub model: String,
    pub instruction: Option<String>,
}

/// Output of a completed analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub filename: String,
    /// Page text, tables and image descriptions in page order
    pub text_content: String,
    pub analysis: String,
    pub model_used: String,
    pub page_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

/// Runs extraction, image description and summarization for one document
pub struct AnalysisPipeline {
    extractor: Arc<dyn DocumentExtractor>,
    model: Arc<dyn AnalysisModel>,
}

impl AnalysisPipeline {
    pub fn new(extractor: Arc<dyn DocumentExtractor>, model: Arc<dyn AnalysisModel>) -> Self {
        Self { extractor, model }
    }

    /// Analyze a document, reporting progress to `sink`.
    ///
    /// Returns `ProcessingError::Cancelled` when the sink asks to stop at a
    /// checkpoint.
    pub async fn run(
        &self,
        request: &AnalysisRequest,
        sink: &dyn ProgressSink,
    ) -> ServiceResult<AnalysisResult> {
        let extractor = self.extractor.clone();
        let content = request.content.clone();
        let document = tokio::task::spawn_blocking(move || extractor.extract(&content))
            .await
            .map_err(ProcessingError::Worker)??;

        let page_count = document.page_count;
        sink.report(
            LOADED_PROGRESS,
            &format!("document loaded ({} pages)", page_count),
        );
        info!(
            filename = %request.filename,
            pages = page_count,
            model = %request.model,
            "Document loaded, analyzing pages"
        );

        let mut text = DocumentText::new();
        for (page_index, page) in document.pages.iter().enumerate() {
            checkpoint(sink)?;

            let page_number = page.page_number;
            let units_total = page.images.len() + 1;

            text.push_page(page_number, &page.text);
            for (table_index, table) in page.tables.iter().enumerate() {
                text.push_table(table_index + 1, table);
            }
            sink.report(
                page_progress(page_index, page_count, 1, units_total),
                &format!("extracted page {}/{}", page_number, page_count),
            );

            if !page.images.is_empty() {
                text.push_images_header(page.images.len());
            }

            for (image_index, image) in page.images.iter().enumerate() {
                checkpoint(sink)?;

                let image_number = image_index + 1;
                debug!(
                    page = page_number,
                    image = image_number,
                    x = image.position.x,
                    y = image.position.y,
                    width = image.position.width,
                    height = image.position.height,
                    "Describing image"
                );
                sink.report(
                    page_progress(page_index, page_count, image_index + 1, units_total),
                    &format!(
                        "describing image {}/{} on page {}",
                        image_number,
                        page.images.len(),
                        page_number
                    ),
                );

                match self.model.describe_image(&request.model, &image.png).await {
                    Ok(description) => text.push_image_description(image_number, &description),
                    Err(e) => {
                        warn!(
                            page = page_number,
                            image = image_number,
                            error = %e,
                            "Image description failed, continuing"
                        );
                        metrics::counter!("docent_image_descriptions_failed_total").increment(1);
                        text.push_image_failure(image_number, &format_error_chain(&e));
                    }
                }
            }

            text.end_page();
            if !page.images.is_empty() {
                sink.report(
                    page_progress(page_index, page_count, units_total, units_total),
                    &format!("finished page {}/{}", page_number, page_count),
                );
            }

            debug!(
                page = page_number,
                tables = page.tables.len(),
                images = page.images.len(),
                "Page analyzed"
            );
        }

        if text.is_blank() {
            return Err(ProcessingError::NoTextExtracted.into());
        }
        let text_content = text.finish();

        checkpoint(sink)?;
        sink.report(EXTRACTED_PROGRESS, "generating analysis");

        let analysis = self
            .model
            .summarize(&request.model, &text_content, request.instruction.as_deref())
            .await?;

        sink.report(COMPLETE_PROGRESS, "complete");
        info!(
            filename = %request.filename,
            pages = page_count,
            text_len = text_content.len(),
            "Document analysis complete"
        );

        Ok(AnalysisResult {
            filename: request.filename.clone(),
            text_content,
            analysis,
            model_used: request.model.clone(),
            page_count,
            task_id: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::ingestion::Table;
    use crate::testing::{
        CancelAfter, FakeExtractor, FakeModel, RecordingProgress, image_page, request, text_page,
    };

    fn pipeline(extractor: FakeExtractor, model: FakeModel) -> AnalysisPipeline {
        AnalysisPipeline::new(Arc::new(extractor), Arc::new(model))
    }

    #[tokio::test]
    async fn test_page_markers_in_order() {
        let pages = (1..=4).map(|n| text_page(n, &format!("body {}", n))).collect();
        let pipeline = pipeline(FakeExtractor::with_pages(pages), FakeModel::new());

        let result = pipeline
            .run(&request("four.pdf"), &NoopProgress)
            .await
            .unwrap();

        assert_eq!(result.page_count, 4);
        assert_eq!(result.filename, "four.pdf");
        assert_eq!(result.model_used, "test-model");
        assert!(result.task_id.is_none());

        let positions: Vec<usize> = (1..=4)
            .map(|n| {
                result
                    .text_content
                    .find(&format!("--- Page {} ---", n))
                    .unwrap()
            })
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(result.text_content.matches("--- Page ").count(), 4);
    }

    #[tokio::test]
    async fn test_tables_and_descriptions_are_interleaved() {
        let mut first = text_page(1, "Summary");
        first.tables.push(Table {
            rows: vec![
                vec!["k".to_string(), "v".to_string()],
                vec!["a".to_string(), String::new()],
            ],
        });
        let pages = vec![first, image_page(2, "Figures", 2)];
        let pipeline = pipeline(FakeExtractor::with_pages(pages), FakeModel::new());

        let result = pipeline
            .run(&request("mixed.pdf"), &NoopProgress)
            .await
            .unwrap();

        let text = &result.text_content;
        let table = text.find("[Table 1]\nk | v\na | \n").unwrap();
        let page_two = text.find("--- Page 2 ---").unwrap();
        let image_two = text.find("[Image 2]\ndescription of image 2").unwrap();
        assert!(table < page_two);
        assert!(page_two < image_two);
        assert_eq!(result.analysis, "analysis of 2 pages");
    }

    #[tokio::test]
    async fn test_image_failures_do_not_abort_the_run() {
        let pages = vec![image_page(1, "one", 2), image_page(2, "two", 1)];
        let pipeline = pipeline(
            FakeExtractor::with_pages(pages),
            FakeModel::new().failing_images(),
        );

        let result = pipeline
            .run(&request("images.pdf"), &NoopProgress)
            .await
            .unwrap();

        assert_eq!(result.text_content.matches("description failed").count(), 3);
        assert!(result.text_content.contains("vision unavailable"));
        assert_eq!(result.analysis, "analysis of 2 pages");
    }

    #[tokio::test]
    async fn test_summarize_failure_is_fatal() {
        let pipeline = pipeline(
            FakeExtractor::with_pages(vec![text_page(1, "text")]),
            FakeModel::new().failing_summary(),
        );

        let err = pipeline
            .run(&request("doc.pdf"), &NoopProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Ollama(_)));
    }

    #[tokio::test]
    async fn test_extraction_failure_propagates() {
        let pipeline = pipeline(FakeExtractor::failing(), FakeModel::new());

        let err = pipeline
            .run(&request("broken.pdf"), &NoopProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Extraction(_)));
    }

    #[tokio::test]
    async fn test_empty_document_is_rejected_before_summarizing() {
        let model = FakeModel::new();
        let summaries = model.summary_calls();
        let pipeline = pipeline(FakeExtractor::with_pages(Vec::new()), model);

        let err = pipeline
            .run(&request("empty.pdf"), &NoopProgress)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Processing(ProcessingError::NoTextExtracted)
        ));
        assert_eq!(summaries.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_spans_full_range() {
        let pages = vec![
            image_page(1, "one", 3),
            text_page(2, "two"),
            image_page(3, "three", 1),
        ];
        let pipeline = pipeline(FakeExtractor::with_pages(pages), FakeModel::new());
        let sink = RecordingProgress::new();

        pipeline.run(&request("doc.pdf"), &sink).await.unwrap();

        let updates = sink.updates();
        assert_eq!(updates.first().unwrap(), &(10, "document loaded (3 pages)".to_string()));
        assert_eq!(updates.last().unwrap(), &(100, "complete".to_string()));
        assert!(updates.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(updates.contains(&(90, "generating analysis".to_string())));
        assert!(updates.iter().all(|(p, _)| *p <= 100));
    }

    #[tokio::test]
    async fn test_cancellation_at_first_page_checkpoint() {
        let model = FakeModel::new();
        let summaries = model.summary_calls();
        let pipeline = pipeline(
            FakeExtractor::with_pages(vec![text_page(1, "one"), text_page(2, "two")]),
            model,
        );

        let err = pipeline
            .run(&request("doc.pdf"), &CancelAfter::checks(0))
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
        assert_eq!(summaries.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_between_images() {
        let model = FakeModel::new();
        let descriptions = model.image_calls();
        let pipeline = pipeline(
            FakeExtractor::with_pages(vec![image_page(1, "one", 3)]),
            model,
        );

        // Page checkpoint and the first image checkpoint pass, the second image's fails
        let err = pipeline
            .run(&request("doc.pdf"), &CancelAfter::checks(2))
            .await
            .unwrap_err();
        assert!(err.is_cancellation());
        assert_eq!(descriptions.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
