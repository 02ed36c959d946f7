//! Query embeddings for legal-context retrieval.
//!
//! Vectors are 768-dimensional and L2-normalised before use; the knowledge
//! base is searched by cosine distance and assumes unit vectors.

use std::sync::Arc;

use async_trait::async_trait;
use meritdraft_core::EMBEDDING_DIM;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AiError, GeminiConfig, RetryPolicy};

/// Asymmetric embedding role: queries and stored documents are embedded
/// differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    RetrievalQuery,
    RetrievalDocument,
}

/// One embedding round trip, without retry.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>, AiError>;
}

#[derive(Serialize)]
pub(crate) struct Part<'a> {
    pub text: &'a str,
}

#[derive(Serialize)]
pub(crate) struct Content<'a> {
    pub parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: TaskType,
    output_dimensionality: usize,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    values: Vec<f32>,
}

/// Gemini `embedContent` over HTTP.
pub struct GeminiEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: String,
}

impl GeminiEmbedder {
    pub fn new(config: &GeminiConfig) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(config.embed_timeout)
            .build()?;
        Ok(Self {
            client,
            url: config.embedding_url.clone(),
            model: config.embedding_model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingBackend for GeminiEmbedder {
    async fn embed(&self, text: &str, task: TaskType) -> Result<Vec<f32>, AiError> {
        let body = EmbedRequest {
            model: &self.model,
            content: Content {
                parts: [Part { text }],
            },
            task_type: task,
            output_dimensionality: EMBEDDING_DIM,
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

        let parsed: EmbedResponse =
            serde_json::from_str(&text).map_err(|e| AiError::Decode(e.to_string()))?;
        Ok(parsed.embedding.values)
    }
}

/// Retrying, normalising front end over an [`EmbeddingBackend`].
#[derive(Clone)]
pub struct EmbeddingClient {
    backend: Arc<dyn EmbeddingBackend>,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    pub fn new(backend: Arc<dyn EmbeddingBackend>, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    /// Embed a retrieval query as a unit vector.
    ///
    /// Any failure, including a terminal one on the first attempt, is
    /// reported as [`AiError::EmbeddingFailed`].
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, AiError> {
        let backend = &self.backend;
        let mut vector = self
            .retry
            .run("embed", move || async move {
                let v = backend.embed(text, TaskType::RetrievalQuery).await?;
                if v.len() != EMBEDDING_DIM {
                    return Err(AiError::Dimension {
                        expected: EMBEDDING_DIM,
                        got: v.len(),
                    });
                }
                Ok(v)
            })
            .await
            .map_err(|e| AiError::EmbeddingFailed {
                attempts: e.attempts,
                source: Box::new(e.last),
            })?;

        normalize(&mut vector);
        debug!(chars = text.len(), "embedded retrieval query");
        Ok(vector)
    }
}

/// L2-normalize a vector in place. A zero vector is left unchanged.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
