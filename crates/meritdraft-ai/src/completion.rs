//! Text completion for section drafting.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::embedder::{Content, Part};
use crate::{AiError, GeminiConfig, RetryPolicy};

/// Appended to prompts cut at the character ceiling.
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated due to length...]";

const DEFAULT_MAX_PROMPT_CHARS: usize = 30_000;

/// One completion round trip, without retry.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, AiError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

/// Extract the generated text from a 200 `generateContent` body.
///
/// Error payloads, safety blocks, missing candidates and candidates without
/// parts are terminal; a body whose parts are all empty is
/// [`AiError::EmptyContent`], which callers may retry.
pub fn interpret_response(body: &str) -> Result<String, AiError> {
    let resp: GenerateResponse =
        serde_json::from_str(body).map_err(|e| AiError::Decode(e.to_string()))?;

    if let Some(err) = resp.error.filter(|e| !e.message.is_empty()) {
        return Err(AiError::Api {
            code: err.code,
            message: err.message,
        });
    }

    if let Some(reason) = resp
        .prompt_feedback
        .and_then(|f| f.block_reason)
        .filter(|r| !r.is_empty())
    {
        return Err(AiError::Blocked(reason));
    }

    if resp.candidates.is_empty() {
        return Err(AiError::NoCandidates);
    }

    let mut text = String::new();
    for (i, candidate) in resp.candidates.into_iter().enumerate() {
        let finish = candidate.finish_reason.unwrap_or_default();
        if !finish.is_empty() && finish != "STOP" {
            warn!(candidate = i, finish_reason = %finish, "candidate did not finish normally");
        }

        let parts = candidate.content.map(|c| c.parts).unwrap_or_default();
        if parts.is_empty() {
            let reason = if finish.is_empty() {
                "unspecified".to_string()
            } else {
                finish
            };
            return Err(AiError::NoParts(reason));
        }

        for part in parts {
            if let Some(t) = part.text.filter(|t| !t.is_empty()) {
                text.push_str(&t);
            }
        }
    }

    if text.is_empty() {
        return Err(AiError::EmptyContent);
    }
    Ok(text)
}

/// Cut `prompt` to at most `max_chars` characters plus [`TRUNCATION_MARKER`].
pub fn truncate_prompt(prompt: &str, max_chars: usize) -> Cow<'_, str> {
    match prompt.char_indices().nth(max_chars) {
        Some((idx, _)) => Cow::Owned(format!("{}{TRUNCATION_MARKER}", &prompt[..idx])),
        None => Cow::Borrowed(prompt),
    }
}

/// Gemini `generateContent` over HTTP.
pub struct GeminiCompletion {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl GeminiCompletion {
    pub fn new(config: &GeminiConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(config.generation_timeout)
            .build()?;
        Ok(Self {
            client,
            url: config.generation_url.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl CompletionBackend for GeminiCompletion {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, AiError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig { temperature },
        };

        let resp = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(AiError::Server {
                status: status.as_u16(),
                body: text,
            });
        }
        interpret_response(&text)
    }
}

/// Truncating, retrying front end over a [`CompletionBackend`].
#[derive(Clone)]
pub struct CompletionClient {
    backend: Arc<dyn CompletionBackend>,
    retry: RetryPolicy,
    max_prompt_chars: usize,
}

impl CompletionClient {
    pub fn new(backend: Arc<dyn CompletionBackend>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
        }
    }

    pub fn with_max_prompt_chars(mut self, max_prompt_chars: usize) -> Self {
        self.max_prompt_chars = max_prompt_chars;
        self
    }

    /// Complete `prompt`, reporting any failure as
    /// [`AiError::GenerationFailed`].
    pub async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, AiError> {
        let prompt = truncate_prompt(prompt, self.max_prompt_chars);
        if let Cow::Owned(_) = prompt {
            warn!(
                max_chars = self.max_prompt_chars,
                "prompt exceeds character ceiling, truncated"
            );
        }
        debug!(chars = prompt.len(), temperature, "requesting completion");

        let backend = &self.backend;
        let prompt: &str = &prompt;
        self.retry
            .run("generate", move || async move {
                backend.complete(prompt, temperature).await
            })
            .await
            .map_err(|e| AiError::GenerationFailed {
                attempts: e.attempts,
                source: Box::new(e.last),
            })
    }
}
