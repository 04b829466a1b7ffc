use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// API key for the ranking language model
    pub openai_api_key: String,

    /// Chat-completions API base URL
    #[serde(default = "default_openai_api_url")]
    pub openai_api_url: String,

    /// Model used for batch outfit ranking
    #[serde(default = "default_style_model")]
    pub style_model: String,

    #[serde(default = "default_style_temperature")]
    pub style_temperature: f32,

    #[serde(default = "default_style_max_tokens")]
    pub style_max_tokens: u32,

    /// API key for the image generation endpoint
    pub gemini_api_key: String,

    /// Image generation API base URL
    #[serde(default = "default_gemini_api_url")]
    pub gemini_api_url: String,

    /// Model used for mannequin renders
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Upper bound on concurrently running outfit renders
    #[serde(default = "default_max_render_workers")]
    pub max_render_workers: usize,

    /// Deadline applied to every provider call, in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Directory wardrobe image paths are resolved against
    #[serde(default = "default_media_root")]
    pub media_root: String,

    /// Optional JSON file used to seed the wardrobe catalog
    #[serde(default)]
    pub catalog_path: Option<String>,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_openai_api_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_style_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_style_temperature() -> f32 {
    0.3
}

fn default_style_max_tokens() -> u32 {
    2000
}

fn default_gemini_api_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_max_render_workers() -> usize {
    crate::services::render::DEFAULT_MAX_WORKERS
}

fn default_provider_timeout_secs() -> u64 {
    60
}

fn default_media_root() -> String {
    "media".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let config = envy::from_env::<Config>()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the render pipeline cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_render_workers == 0 {
            anyhow::bail!("MAX_RENDER_WORKERS must be a positive integer");
        }
        if self.provider_timeout_secs == 0 {
            anyhow::bail!("PROVIDER_TIMEOUT_SECS must be a positive integer");
        }
        Ok(())
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }
}
