use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::OllamaConfig;
use crate::error::{OllamaError, ServiceError, ServiceResult};

/// Ollama API client
pub struct OllamaClient {
    client: Client,
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: OllamaConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| {
                ServiceError::Ollama(OllamaError::Connection {
                    url: config.base_url.clone(),
                    source: e,
                })
            })?;

        Ok(Self { client, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);

        match self.client.get(&url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!(error = %e, "Ollama health check failed");
                false
            }
        }
    }

    /// List locally available models
    pub async fn list_models(&self) -> Result<Vec<ModelInfo>, OllamaError> {
        let url = format!("{}/api/tags", self.config.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OllamaError::Connection {
                url: url.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            return Err(OllamaError::Generation {
                status: response.status().as_u16(),
                message: "Failed to list models".to_string(),
            });
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| OllamaError::InvalidResponse { source: e })?;

        Ok(tags
            .models
            .into_iter()
            .map(|model| ModelInfo {
                name: model.name,
                parameter_size: model.details.parameter_size,
                quantization: model.details.quantization_level,
            })
            .collect())
    }

    /// Generate a non-streaming chat response
    pub async fn generate_simple(
        &self,
        model: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<String, OllamaError> {
        let url = format!("{}/api/chat", self.config.base_url);

        let request = OllamaChatRequest {
            model: model.to_string(),
            messages,
            stream: false,
            options: Some(OllamaOptions {
                temperature: Some(self.config.temperature),
            }),
        };

        debug!(model = %model, "Sending Ollama chat request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OllamaError::Connection {
                url: url.clone(),
                source: e,
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();

            if message.contains("model") && message.contains("not found") {
                return Err(OllamaError::ModelNotFound {
                    model: model.to_string(),
                });
            }

            return Err(OllamaError::Generation { status, message });
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| OllamaError::InvalidResponse { source: e })?;

        Ok(chat_response.message.content)
    }
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    /// Base64-encoded images for vision models
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl ChatMessage {
    /// Create a plain user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            images: None,
        }
    }

    /// Create a user message with an image for vision models
    pub fn user_with_image(content: impl Into<String>, image_base64: String) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
            images: Some(vec![image_base64]),
        }
    }
}

/// Model information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub parameter_size: Option<String>,
    pub quantization: Option<String>,
}

// Internal Ollama API types

#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
    #[serde(default)]
    details: ModelDetails,
}

#[derive(Debug, Default, Deserialize)]
struct ModelDetails {
    #[serde(default)]
    parameter_size: Option<String>,
    #[serde(default)]
    quantization_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_omits_missing_images() {
        let request = OllamaChatRequest {
            model: "gemma3:4b".to_string(),
            messages: vec![ChatMessage::user("hello")],
            stream: false,
            options: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert!(json["messages"][0].get("images").is_none());
        assert!(json.get("options").is_none());
    }

    #[test]
    fn test_tags_response_tolerates_missing_details() {
        let tags: TagsResponse = serde_json::from_str(
            r#"{"models":[{"name":"gemma3:4b","details":{"parameter_size":"4.3B"}},{"name":"llava"}]}"#,
        )
        .unwrap();
        assert_eq!(tags.models.len(), 2);
        assert_eq!(tags.models[0].details.parameter_size.as_deref(), Some("4.3B"));
        assert!(tags.models[1].details.quantization_level.is_none());
    }
}
