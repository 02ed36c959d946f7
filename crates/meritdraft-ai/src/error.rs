use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("prompt blocked: {0}")]
    Blocked(String),

    #[error("API returned no candidates")]
    NoCandidates,

    #[error("candidate has no content parts (finish reason: {0})")]
    NoParts(String),

    #[error("API returned empty content")]
    EmptyContent,

    #[error("embedding has {got} dimensions, expected {expected}")]
    Dimension { expected: usize, got: usize },

    #[error("embedding failed after {attempts} attempt(s): {source}")]
    EmbeddingFailed {
        attempts: u32,
        #[source]
        source: Box<AiError>,
    },

    #[error("generation failed after {attempts} attempt(s): {source}")]
    GenerationFailed {
        attempts: u32,
        #[source]
        source: Box<AiError>,
    },
}

impl AiError {
    /// Whether another attempt could succeed.
    ///
    /// Transport failures, 408/429/5xx, undecodable bodies and empty 200
    /// responses are transient. Client errors, safety blocks, API error
    /// payloads and missing candidates or parts are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Decode(_) | Self::EmptyContent => true,
            Self::Server { status, .. } => *status == 408 || *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Number of attempts made before giving up, for wrapped failures.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::EmbeddingFailed { attempts, .. } | Self::GenerationFailed { attempts, .. } => {
                Some(*attempts)
            }
            _ => None,
        }
    }
}
