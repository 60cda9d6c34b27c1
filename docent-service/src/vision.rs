//! AI description adapter.
//!
//! The pipeline only needs two things from a model runtime: a description of
//! an embedded image, and an analysis of the accumulated document text. The
//! [`AnalysisModel`] trait captures exactly that, and [`OllamaClient`]
//! implements it over the chat API.

use async_trait::async_trait;
use base64::Engine;

use crate::error::OllamaError;
use crate::ollama::{ChatMessage, OllamaClient};

const IMAGE_PROMPT: &str = "Extract all text that appears in this image and describe \
the content of the image in detail. If the image contains text, transcribe it exactly.";

const DEFAULT_ANALYSIS_INSTRUCTION: &str = "Analyze and summarize the following text. \
Organize the main content, the key points, and any important information.";

/// Model operations used by the analysis pipeline
#[async_trait]
pub trait AnalysisModel: Send + Sync {
    /// Describe a PNG-encoded image
    async fn describe_image(&self, model: &str, png: &[u8]) -> Result<String, OllamaError>;

    /// Analyze document text, optionally following a caller-supplied instruction
    async fn summarize(
        &self,
        model: &str,
        text: &str,
        instruction: Option<&str>,
    ) -> Result<String, OllamaError>;
}

#[async_trait]
impl AnalysisModel for OllamaClient {
    async fn describe_image(&self, model: &str, png: &[u8]) -> Result<String, OllamaError> {
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(png);
        let message = ChatMessage::user_with_image(IMAGE_PROMPT, image_base64);
        self.generate_simple(model, vec![message]).await
    }

    async fn summarize(
        &self,
        model: &str,
        text: &str,
        instruction: Option<&str>,
    ) -> Result<String, OllamaError> {
        let message = ChatMessage::user(build_analysis_prompt(text, instruction));
        self.generate_simple(model, vec![message]).await
    }
}

/// Build the summarization prompt. A blank instruction falls back to the default.
pub fn build_analysis_prompt(text: &str, instruction: Option<&str>) -> String {
    let instruction = instruction
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .unwrap_or(DEFAULT_ANALYSIS_INSTRUCTION);
    format!("{}\n\n{}", instruction, text)
}
