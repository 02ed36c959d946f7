use std::time::Duration;

use crate::AiError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_EMBEDDING_MODEL: &str = "gemini-embedding-001";
const DEFAULT_GENERATION_MODEL: &str = "gemini-3-pro-preview";

/// Connection settings for the Gemini embedding and generation endpoints.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub embedding_url: String,
    /// Model name sent in the embedding request body, e.g. `models/gemini-embedding-001`.
    pub embedding_model: String,
    pub generation_url: String,
    pub embed_timeout: Duration,
    pub generation_timeout: Duration,
}

impl GeminiConfig {
    /// Configuration for the public Gemini API. Fails on an empty key.
    pub fn new(api_key: impl Into<String>) -> Result<Self, AiError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Configuration against a different API root (proxy, test server).
    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Result<Self, AiError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AiError::Config("Gemini API key is empty".into()));
        }
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            api_key,
            embedding_url: format!("{base}/models/{DEFAULT_EMBEDDING_MODEL}:embedContent"),
            embedding_model: format!("models/{DEFAULT_EMBEDDING_MODEL}"),
            generation_url: format!("{base}/models/{DEFAULT_GENERATION_MODEL}:generateContent"),
            embed_timeout: Duration::from_secs(30),
            generation_timeout: Duration::from_secs(120),
        })
    }

    /// Swap the generation model, keeping the API root.
    pub fn generation_model(mut self, model: &str) -> Self {
        if let Some((root, _)) = self.generation_url.split_once("/models/") {
            self.generation_url = format!("{root}/models/{model}:generateContent");
        }
        self
    }
}
