//! Gemini `generateContent` client.
//!
//! One client serves both ports: image classification uses the vision model
//! with an inline base64 image, advice and narratives use the text model.

use crate::config::{GeminiConfig, HttpConfig};
use crate::domain::model::{ImageInput, WoundLabel};
use crate::domain::ports::{TextGenerator, WoundClassifier};
use crate::utils::error::{AidError, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const PROVIDER: &str = "gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// 固定的傷口分類提示詞
pub fn classification_prompt() -> String {
    let labels: Vec<String> = WoundLabel::ALL
        .iter()
        .map(|label| format!("'{}'", label.prompt_name()))
        .collect();
    let (last, rest) = labels
        .split_last()
        .map(|(last, rest)| (last.clone(), rest.join(", ")))
        .unwrap_or_default();

    format!(
        "You are an expert in understanding types of wounds from images.\n\
         You will receive wound images as input.\n\
         Classify the wound as exactly one of the following categories: {}, or {}.\n\
         Only respond with one of these five labels.",
        rest, last
    )
}

pub struct GeminiClient {
    endpoint: String,
    api_key: String,
    vision_model: String,
    text_model: String,
    temperature: f32,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            vision_model: config.vision_model.clone(),
            text_model: config.text_model.clone(),
            temperature: config.temperature,
            client: http.build_client(None)?,
        })
    }

    fn api_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, model)
    }

    async fn generate_content(
        &self,
        model: &str,
        parts: Vec<ContentPart>,
        temperature: Option<f32>,
    ) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: temperature.map(|t| GenerationConfig {
                temperature: Some(t),
            }),
        };

        tracing::debug!(
            model = %model,
            parts = request.contents[0].parts.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(self.api_url(model))
            .header(API_KEY_HEADER, self.api_key.as_str())
            .json(&request)
            .send()
            .await
            .map_err(|e| AidError::upstream(PROVIDER, None, e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AidError::upstream(
                PROVIDER,
                Some(status.as_u16()),
                error_text.chars().take(200).collect::<String>(),
            ));
        }

        let api_response: GenerateContentResponse =
            response.json().await.map_err(|e| AidError::GenerationFailure {
                message: format!("failed to parse response: {}", e.without_url()),
            })?;

        api_response.into_text()
    }
}

#[async_trait]
impl WoundClassifier for GeminiClient {
    async fn classify(&self, image: &ImageInput) -> Result<String> {
        let parts = vec![
            ContentPart::Text {
                text: classification_prompt(),
            },
            ContentPart::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.clone(),
                    data: STANDARD.encode(&image.bytes),
                },
            },
        ];

        self.generate_content(&self.vision_model, parts, None).await
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, context: Option<&str>) -> Result<String> {
        let mut parts = vec![ContentPart::Text {
            text: prompt.to_string(),
        }];
        if let Some(context) = context {
            parts.push(ContentPart::Text {
                text: context.to_string(),
            });
        }

        self.generate_content(&self.text_model, parts, Some(self.temperature))
            .await
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(alias = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(alias = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

impl GenerateContentResponse {
    /// 串接第一個候選的所有文字片段
    fn into_text(self) -> Result<String> {
        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AidError::GenerationFailure {
                message: "response has no candidates".to_string(),
            })?;

        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(AidError::GenerationFailure {
                message: "response blocked by safety filter".to_string(),
            });
        }

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text),
                ContentPart::InlineData { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("");

        let text = text.trim();
        if text.is_empty() {
            return Err(AidError::GenerationFailure {
                message: "response contained no text".to_string(),
            });
        }

        Ok(text.to_string())
    }
}
