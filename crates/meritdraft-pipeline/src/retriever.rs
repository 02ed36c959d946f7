//! Legal-context retrieval: one embedded query per criterion, fanned out to
//! the regulation, appeal-decision and precedent-case partitions.

use std::sync::Arc;

use async_trait::async_trait;
use meritdraft_ai::{AiError, EmbeddingClient};
use meritdraft_core::{Criterion, LegalChunk, SourceType, sanitize_field};
use meritdraft_store::{ChunkQuery, LegalChunkStore};
use tracing::{debug, warn};

use crate::config::RetrievalLimits;

/// Per-criterion context. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievedContext {
    pub regulations: Vec<LegalChunk>,
    pub appeals: Vec<LegalChunk>,
    pub cases: Vec<LegalChunk>,
}

impl RetrievedContext {
    pub fn is_empty(&self) -> bool {
        self.regulations.is_empty() && self.appeals.is_empty() && self.cases.is_empty()
    }
}

/// Context for the final merits section: the two-part test and the
/// evidentiary standard.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeritsContext {
    /// Regulation chunks naming the Kazarian standard.
    pub standard: Vec<LegalChunk>,
    /// Appeal chunks citing Matter of Chawathe.
    pub proof: Vec<LegalChunk>,
}

#[async_trait]
pub trait ContextRetriever: Send + Sync {
    /// Fails only when the query cannot be embedded.
    async fn retrieve(
        &self,
        criterion: Criterion,
        field_of_expertise: &str,
        fact_summary: &str,
    ) -> Result<RetrievedContext, AiError>;

    async fn retrieve_merits(&self, field_of_expertise: &str) -> Result<MeritsContext, AiError>;
}

/// `[CRITERION: <id>] [FIELD: <sanitized field>] <summary>`; the criterion
/// slot is left empty for the merits query.
pub fn build_query(criterion: Option<Criterion>, field_of_expertise: &str, summary: &str) -> String {
    let id = criterion.map(|c| c.as_str()).unwrap_or("");
    let field = sanitize_field(field_of_expertise);
    format!("[CRITERION: {id}] [FIELD: {field}] {summary}")
}

/// Retriever backed by an embedding client and a legal chunk store.
pub struct LegalContextRetriever {
    embedder: EmbeddingClient,
    chunks: Arc<dyn LegalChunkStore>,
    limits: RetrievalLimits,
}

impl LegalContextRetriever {
    pub fn new(
        embedder: EmbeddingClient,
        chunks: Arc<dyn LegalChunkStore>,
        limits: RetrievalLimits,
    ) -> Self {
        Self {
            embedder,
            chunks,
            limits,
        }
    }

    /// One partition search. Failures degrade to an empty list.
    async fn search(
        &self,
        embedding: &[f32],
        criterion: Option<Criterion>,
        source_type: SourceType,
        limit: usize,
    ) -> Vec<LegalChunk> {
        let query = ChunkQuery::new(embedding, criterion, source_type, limit);
        match self.chunks.search_by_criterion(&query).await {
            Ok(chunks) => {
                debug!(%source_type, hits = chunks.len(), "partition search");
                chunks
            }
            Err(e) => {
                warn!(%source_type, error = %e, "partition search failed, continuing without it");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ContextRetriever for LegalContextRetriever {
    async fn retrieve(
        &self,
        criterion: Criterion,
        field_of_expertise: &str,
        fact_summary: &str,
    ) -> Result<RetrievedContext, AiError> {
        let query = build_query(Some(criterion), field_of_expertise, fact_summary);
        let embedding = self.embedder.embed_query(&query).await?;
        let tag = Some(criterion);

        Ok(RetrievedContext {
            regulations: self
                .search(&embedding, tag, SourceType::Regulation, self.limits.regulations)
                .await,
            appeals: self
                .search(&embedding, tag, SourceType::AppealDecision, self.limits.appeals)
                .await,
            cases: self
                .search(&embedding, tag, SourceType::PrecedentCase, self.limits.cases)
                .await,
        })
    }

    async fn retrieve_merits(&self, field_of_expertise: &str) -> Result<MeritsContext, AiError> {
        let summary = format!("Final Merits Kazarian Chawathe {field_of_expertise}");
        let query = build_query(None, field_of_expertise, &summary);
        let embedding = self.embedder.embed_query(&query).await?;

        let standard = self
            .search(&embedding, None, SourceType::Regulation, self.limits.merits)
            .await
            .into_iter()
            .filter(|c| c.legal_standard.as_deref().is_some_and(|s| s.contains("Kazarian")))
            .collect();
        let proof = self
            .search(&embedding, None, SourceType::AppealDecision, self.limits.merits)
            .await
            .into_iter()
            .filter(|c| c.appeal_citation.as_deref().is_some_and(|s| s.contains("Chawathe")))
            .collect();

        Ok(MeritsContext { standard, proof })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meritdraft_ai::{EmbeddingBackend, RetryPolicy, TaskType};
    use meritdraft_core::EMBEDDING_DIM;
    use meritdraft_store::{MemoryChunkStore, StoreError};
    use parking_lot::Mutex;
    use std::time::Duration;
    use uuid::Uuid;

    /// Returns a fixed unit vector and records each query text.
    #[derive(Default)]
    struct FixedEmbedder {
        queries: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingBackend for FixedEmbedder {
        async fn embed(&self, text: &str, _task: TaskType) -> Result<Vec<f32>, AiError> {
            self.queries.lock().push(text.to_string());
            if self.fail {
                return Err(AiError::Server {
                    status: 401,
                    body: "unauthorised".into(),
                });
            }
            let mut v = vec![0.0; EMBEDDING_DIM];
            v[0] = 1.0;
            Ok(v)
        }
    }

    /// Fails every search for one partition.
    struct FlakyStore {
        inner: MemoryChunkStore,
        broken: SourceType,
    }

    #[async_trait]
    impl LegalChunkStore for FlakyStore {
        async fn search_by_criterion(
            &self,
            query: &ChunkQuery<'_>,
        ) -> Result<Vec<LegalChunk>, StoreError> {
            if query.source_type == self.broken {
                return Err(StoreError::Other("partition offline".into()));
            }
            self.inner.search_by_criterion(query).await
        }
    }

    fn chunk(source_type: SourceType, tag: Option<Criterion>) -> LegalChunk {
        LegalChunk {
            id: Uuid::new_v4(),
            text: format!("{source_type} text"),
            source_type,
            source_document: String::new(),
            regulatory_citation: vec![],
            case_citation: None,
            appeal_citation: None,
            criterion_tag: tag,
            legal_standard: None,
            legal_test: None,
            is_winning_argument: true,
            is_holding: true,
            distance: None,
        }
    }

    fn unit() -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIM];
        v[0] = 1.0;
        v
    }

    fn embedder(backend: Arc<FixedEmbedder>) -> EmbeddingClient {
        EmbeddingClient::new(backend, RetryPolicy::new(3, Duration::ZERO).unwrap())
    }

    fn populated() -> MemoryChunkStore {
        let store = MemoryChunkStore::new();
        for _ in 0..5 {
            store.insert(chunk(SourceType::Regulation, Some(Criterion::Awards)), unit());
            store.insert(chunk(SourceType::AppealDecision, Some(Criterion::Awards)), unit());
            store.insert(chunk(SourceType::PrecedentCase, Some(Criterion::Awards)), unit());
        }
        store
    }

    #[test]
    fn query_format() {
        assert_eq!(
            build_query(
                Some(Criterion::Judging),
                "I am a researcher in Artificial Intelligence and Machine Learning systems",
                "ICML Area Chair"
            ),
            "[CRITERION: judging] [FIELD: researcher in Artificial Intelligence and] ICML Area Chair"
        );
        assert_eq!(
            build_query(None, "Robotics", "Final Merits Kazarian Chawathe Robotics"),
            "[CRITERION: ] [FIELD: Robotics] Final Merits Kazarian Chawathe Robotics"
        );
    }

    #[tokio::test]
    async fn partitions_respect_limits() {
        let backend = Arc::new(FixedEmbedder::default());
        let retriever = LegalContextRetriever::new(
            embedder(backend.clone()),
            Arc::new(populated()),
            RetrievalLimits::default(),
        );
        let ctx = retriever
            .retrieve(Criterion::Awards, "Physics", "Nobel Prize")
            .await
            .unwrap();
        assert_eq!(ctx.regulations.len(), 3);
        assert_eq!(ctx.appeals.len(), 3);
        assert_eq!(ctx.cases.len(), 2);
        assert_eq!(
            backend.queries.lock()[0],
            "[CRITERION: awards] [FIELD: Physics] Nobel Prize"
        );
    }

    #[tokio::test]
    async fn failed_partition_yields_empty_list() {
        let backend = Arc::new(FixedEmbedder::default());
        let store = FlakyStore {
            inner: populated(),
            broken: SourceType::AppealDecision,
        };
        let retriever =
            LegalContextRetriever::new(embedder(backend), Arc::new(store), RetrievalLimits::default());
        let ctx = retriever
            .retrieve(Criterion::Awards, "Physics", "")
            .await
            .unwrap();
        assert_eq!(ctx.regulations.len(), 3);
        assert!(ctx.appeals.is_empty());
        assert_eq!(ctx.cases.len(), 2);
    }

    #[tokio::test]
    async fn embedding_failure_fails_retrieval() {
        let backend = Arc::new(FixedEmbedder {
            fail: true,
            ..Default::default()
        });
        let retriever = LegalContextRetriever::new(
            embedder(backend.clone()),
            Arc::new(populated()),
            RetrievalLimits::default(),
        );
        let err = retriever
            .retrieve(Criterion::Awards, "Physics", "")
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::EmbeddingFailed { attempts: 1, .. }));
        assert_eq!(backend.queries.lock().len(), 1);
    }

    #[tokio::test]
    async fn merits_keeps_only_controlling_authority() {
        let store = MemoryChunkStore::new();
        let mut kazarian = chunk(SourceType::Regulation, None);
        kazarian.legal_standard = Some("Kazarian two-part test".into());
        let other_standard = chunk(SourceType::Regulation, None);
        let mut chawathe = chunk(SourceType::AppealDecision, None);
        chawathe.appeal_citation = Some("Matter of Chawathe, 25 I&N Dec. 369 (AAO 2010)".into());
        let mut other_appeal = chunk(SourceType::AppealDecision, None);
        other_appeal.appeal_citation = Some("Matter of Dhanasar".into());
        let tagged = chunk(SourceType::Regulation, Some(Criterion::Awards));
        for c in [kazarian.clone(), other_standard, chawathe.clone(), other_appeal, tagged] {
            store.insert(c, unit());
        }

        let backend = Arc::new(FixedEmbedder::default());
        let retriever = LegalContextRetriever::new(
            embedder(backend.clone()),
            Arc::new(store),
            RetrievalLimits::default(),
        );
        let ctx = retriever.retrieve_merits("Quantum Computing").await.unwrap();
        assert_eq!(ctx.standard.len(), 1);
        assert_eq!(ctx.standard[0].id, kazarian.id);
        assert_eq!(ctx.proof.len(), 1);
        assert_eq!(ctx.proof[0].id, chawathe.id);
        assert_eq!(
            backend.queries.lock()[0],
            "[CRITERION: ] [FIELD: Quantum Computing] Final Merits Kazarian Chawathe Quantum Computing"
        );
    }
}
