use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("petition not found: {0}")]
    PetitionNotFound(Uuid),

    #[error("generation job not found: {0}")]
    JobNotFound(Uuid),

    #[error("record already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("embedding must be {expected} dimensions, got {got}")]
    Dimension { expected: usize, got: usize },

    #[error("invalid job update: {0}")]
    Job(#[from] meritdraft_core::JobError),

    #[error("serialisation error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[cfg(feature = "lancedb")]
    #[error("lancedb error: {0}")]
    Lance(#[from] ::lancedb::Error),

    #[cfg(feature = "lancedb")]
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PetitionNotFound(_) | Self::JobNotFound(_))
    }
}
