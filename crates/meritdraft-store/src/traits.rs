//! Store interfaces consumed by the drafting pipeline.
//!
//! All stores work on whole records: a read returns the full record and a
//! write replaces it. Nothing here provides compare-and-swap; callers must
//! ensure a job has a single owner while it is being processed.

use async_trait::async_trait;
use meritdraft_core::{
    Criterion, EMBEDDING_DIM, GenerationJob, GenerationStep, JobStatus, LegalChunk, Petition,
    SourceType,
};
use uuid::Uuid;

use crate::StoreError;

#[async_trait]
pub trait PetitionStore: Send + Sync {
    async fn create(&self, petition: &Petition) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Petition, StoreError>;

    async fn update(&self, petition: &Petition) -> Result<(), StoreError>;

    async fn set_generated_content(&self, id: Uuid, content: &str) -> Result<(), StoreError>;
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create(&self, job: &GenerationJob) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<GenerationJob, StoreError>;

    /// Most recently created job for a petition.
    async fn latest_for_petition(
        &self,
        petition_id: Uuid,
    ) -> Result<Option<GenerationJob>, StoreError>;

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError>;

    async fn update_progress(
        &self,
        id: Uuid,
        current_step: &str,
        steps: &[GenerationStep],
    ) -> Result<(), StoreError>;

    async fn mark_failed(&self, id: Uuid, message: &str) -> Result<(), StoreError>;

    async fn mark_completed(&self, id: Uuid) -> Result<(), StoreError>;
}

/// Restriction applied on top of the source-type and criterion filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PurityFilter {
    /// Only winning appeal arguments and binding precedent holdings.
    #[default]
    Enforced,
    /// Everything in the partition, including dicta and denial rationale.
    /// Intended for validation tooling, never for drafting.
    Unfiltered,
}

/// A filtered nearest-neighbour query against one knowledge-base partition.
#[derive(Debug, Clone, Copy)]
pub struct ChunkQuery<'a> {
    pub embedding: &'a [f32],
    /// `None` restricts results to chunks without a criterion tag.
    pub criterion: Option<Criterion>,
    pub source_type: SourceType,
    pub limit: usize,
    pub purity: PurityFilter,
}

impl<'a> ChunkQuery<'a> {
    pub fn new(
        embedding: &'a [f32],
        criterion: Option<Criterion>,
        source_type: SourceType,
        limit: usize,
    ) -> Self {
        Self {
            embedding,
            criterion,
            source_type,
            limit,
            purity: PurityFilter::Enforced,
        }
    }

    pub fn with_purity(mut self, purity: PurityFilter) -> Self {
        self.purity = purity;
        self
    }

    pub fn check_dimension(&self) -> Result<(), StoreError> {
        if self.embedding.len() != EMBEDDING_DIM {
            return Err(StoreError::Dimension {
                expected: EMBEDDING_DIM,
                got: self.embedding.len(),
            });
        }
        Ok(())
    }

    /// Whether `chunk` satisfies every filter of this query.
    pub fn matches(&self, chunk: &LegalChunk) -> bool {
        chunk.source_type == self.source_type
            && chunk.criterion_tag == self.criterion
            && (self.purity == PurityFilter::Unfiltered || chunk.is_citable())
    }
}

#[async_trait]
pub trait LegalChunkStore: Send + Sync {
    /// The `query.limit` nearest chunks by cosine distance, nearest first,
    /// with `distance` populated.
    async fn search_by_criterion(
        &self,
        query: &ChunkQuery<'_>,
    ) -> Result<Vec<LegalChunk>, StoreError>;
}
