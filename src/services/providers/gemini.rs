/// Gemini image generation provider
///
/// Sends a text prompt plus one inline PNG to `models/{model}:generateContent`
/// and returns the first inline image part of the first candidate.
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    services::providers::{ImageGenerationRequest, ImageGenerator},
};

#[derive(Clone)]
pub struct GeminiImageGenerator {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl GeminiImageGenerator {
    pub fn new(
        api_key: String,
        api_url: String,
        model: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
            model,
        })
    }

    fn build_body(request: &ImageGenerationRequest) -> GenerateContentBody {
        GenerateContentBody {
            contents: vec![Content {
                parts: vec![
                    RequestPart::Text {
                        text: request.prompt.clone(),
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/png".to_string(),
                            data: STANDARD.encode(&request.source_image),
                        },
                    },
                ],
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentBody {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(alias = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default, alias = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}

/// Decodes the first inline image of the first candidate, if present
fn first_inline_image(response: GenerateContentResponse) -> AppResult<Option<Vec<u8>>> {
    let part = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().find_map(|part| part.inline_data));

    match part {
        Some(inline) => STANDARD
            .decode(inline.data.as_bytes())
            .map(Some)
            .map_err(|e| AppError::ExternalApi(format!("Invalid inline image data: {}", e))),
        None => Ok(None),
    }
}

#[async_trait::async_trait]
impl ImageGenerator for GeminiImageGenerator {
    async fn generate(&self, request: &ImageGenerationRequest) -> AppResult<Option<Vec<u8>>> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        );

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_body(request))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                label = %request.label,
                status = %status,
                body = %body,
                "Gemini request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "Gemini returned status {}: {}",
                status, body
            )));
        }

        let generated: GenerateContentResponse = response.json().await?;

        if let Some(usage) = &generated.usage_metadata {
            tracing::debug!(
                label = %request.label,
                prompt_tokens = usage.prompt_token_count,
                candidate_tokens = usage.candidates_token_count,
                total_tokens = usage.total_token_count,
                "Gemini token usage"
            );
        }

        first_inline_image(generated)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
