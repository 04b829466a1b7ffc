/// Hosted model adapters.
///
/// The pipeline talks to two black-box providers through narrow traits: a
/// language model that answers a system+user prompt (optionally with one
/// attached image) with text, ideally JSON, and an image model that turns a prompt plus one source image into at most
/// one image. Clients are built once at start-up and shared via `Arc<dyn ...>`.
use crate::error::AppResult;

pub mod gemini;
pub mod openai;

pub use gemini::GeminiImageGenerator;
pub use openai::OpenAiStyleModel;

/// A single chat completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for a JSON-object constrained response
    pub json_response: bool,
    /// PNG attached to the user message for vision models
    pub image: Option<Vec<u8>>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait StyleModel: Send + Sync {
    /// Returns the raw text of the first completion choice
    async fn complete(&self, request: &ChatRequest) -> AppResult<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Prompt plus source image for a generative edit
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    /// PNG-encoded source image
    pub source_image: Vec<u8>,
    /// Human-readable subject, used only in logs
    pub label: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns the first inline image the provider produced, if any
    async fn generate(&self, request: &ImageGenerationRequest) -> AppResult<Option<Vec<u8>>>;

    fn name(&self) -> &'static str;
}
