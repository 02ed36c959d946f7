//! AI service layer: query embeddings and text completion against Gemini,
//! with bounded retry and strict response interpretation.

mod completion;
mod config;
mod embedder;
mod error;
mod retry;

pub use completion::{
    CompletionBackend, CompletionClient, GeminiCompletion, TRUNCATION_MARKER, interpret_response,
    truncate_prompt,
};
pub use config::GeminiConfig;
pub use embedder::{EmbeddingBackend, EmbeddingClient, GeminiEmbedder, TaskType, normalize};
pub use error::AiError;
pub use retry::{Exhausted, RetryPolicy};
