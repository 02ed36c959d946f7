//! In-process stores for tests and single-shot CLI runs.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use meritdraft_core::{GenerationJob, GenerationStep, JobStatus, LegalChunk, Petition};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::traits::{ChunkQuery, JobStore, LegalChunkStore, PetitionStore};
use crate::StoreError;

/// Petitions and generation jobs held in memory.
#[derive(Default)]
pub struct MemoryStore {
    petitions: RwLock<HashMap<Uuid, Petition>>,
    jobs: RwLock<HashMap<Uuid, GenerationJob>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.read().len()
    }

    fn with_job<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut GenerationJob) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut jobs = self.jobs.write();
        let job = jobs.get_mut(&id).ok_or(StoreError::JobNotFound(id))?;
        // Apply to a copy so a rejected update leaves the record untouched.
        let mut updated = job.clone();
        let out = f(&mut updated)?;
        *job = updated;
        Ok(out)
    }
}

#[async_trait]
impl PetitionStore for MemoryStore {
    async fn create(&self, petition: &Petition) -> Result<(), StoreError> {
        let mut petitions = self.petitions.write();
        if petitions.contains_key(&petition.id) {
            return Err(StoreError::AlreadyExists(petition.id));
        }
        petitions.insert(petition.id, petition.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Petition, StoreError> {
        self.petitions
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::PetitionNotFound(id))
    }

    async fn update(&self, petition: &Petition) -> Result<(), StoreError> {
        let mut petitions = self.petitions.write();
        let slot = petitions
            .get_mut(&petition.id)
            .ok_or(StoreError::PetitionNotFound(petition.id))?;
        *slot = petition.clone();
        slot.updated_at = Utc::now();
        Ok(())
    }

    async fn set_generated_content(&self, id: Uuid, content: &str) -> Result<(), StoreError> {
        let mut petitions = self.petitions.write();
        let petition = petitions
            .get_mut(&id)
            .ok_or(StoreError::PetitionNotFound(id))?;
        petition.generated_content = Some(content.to_string());
        petition.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn create(&self, job: &GenerationJob) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&job.id) {
            return Err(StoreError::AlreadyExists(job.id));
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<GenerationJob, StoreError> {
        self.jobs
            .read()
            .get(&id)
            .cloned()
            .ok_or(StoreError::JobNotFound(id))
    }

    async fn latest_for_petition(
        &self,
        petition_id: Uuid,
    ) -> Result<Option<GenerationJob>, StoreError> {
        Ok(self
            .jobs
            .read()
            .values()
            .filter(|j| j.petition_id == petition_id)
            .max_by_key(|j| j.created_at)
            .cloned())
    }

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        self.with_job(id, |job| Ok(job.transition(status)?))
    }

    async fn update_progress(
        &self,
        id: Uuid,
        current_step: &str,
        steps: &[GenerationStep],
    ) -> Result<(), StoreError> {
        self.with_job(id, |job| {
            job.current_step = Some(current_step.to_string());
            job.steps = steps.to_vec();
            job.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn mark_failed(&self, id: Uuid, message: &str) -> Result<(), StoreError> {
        self.with_job(id, |job| Ok(job.fail(message)?))
    }

    async fn mark_completed(&self, id: Uuid) -> Result<(), StoreError> {
        self.with_job(id, |job| Ok(job.transition(JobStatus::Completed)?))
    }
}

/// A chunk together with its document embedding.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk: LegalChunk,
    pub embedding: Vec<f32>,
}

/// Brute-force cosine search over an in-memory chunk list.
#[derive(Default)]
pub struct MemoryChunkStore {
    chunks: RwLock<Vec<IndexedChunk>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, chunk: LegalChunk, embedding: Vec<f32>) {
        self.chunks.write().push(IndexedChunk { chunk, embedding });
    }

    pub fn len(&self) -> usize {
        self.chunks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.read().is_empty()
    }
}

#[async_trait]
impl LegalChunkStore for MemoryChunkStore {
    async fn search_by_criterion(
        &self,
        query: &ChunkQuery<'_>,
    ) -> Result<Vec<LegalChunk>, StoreError> {
        query.check_dimension()?;

        let chunks = self.chunks.read();
        let mut hits: Vec<LegalChunk> = chunks
            .iter()
            .filter(|c| query.matches(&c.chunk))
            .map(|c| {
                let mut chunk = c.chunk.clone();
                chunk.distance = Some(cosine_distance(query.embedding, &c.embedding));
                chunk
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .unwrap_or(f32::MAX)
                .total_cmp(&b.distance.unwrap_or(f32::MAX))
        });
        hits.truncate(query.limit);
        Ok(hits)
    }
}

/// `1 - cos(a, b)`; 1.0 when either vector is zero.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        return 1.0;
    }
    1.0 - dot / (na * nb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::PurityFilter;
    use meritdraft_core::{Criterion, EMBEDDING_DIM, SourceType, StepStatus};

    fn axis(i: usize) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIM];
        v[i] = 1.0;
        v
    }

    fn blend(i: usize, j: usize, wj: f32) -> Vec<f32> {
        let mut v = axis(i);
        v[j] = wj;
        v
    }

    fn chunk(text: &str, source_type: SourceType, tag: Option<Criterion>) -> LegalChunk {
        LegalChunk {
            id: Uuid::new_v4(),
            text: text.into(),
            source_type,
            source_document: "test".into(),
            regulatory_citation: vec![],
            case_citation: None,
            appeal_citation: None,
            criterion_tag: tag,
            legal_standard: None,
            legal_test: None,
            is_winning_argument: false,
            is_holding: false,
            distance: None,
        }
    }

    #[tokio::test]
    async fn petition_crud() {
        let store = MemoryStore::new();
        let p = Petition::new(Uuid::new_v4());
        PetitionStore::create(&store, &p).await.unwrap();
        assert!(matches!(
            PetitionStore::create(&store, &p).await,
            Err(StoreError::AlreadyExists(_))
        ));

        store.set_generated_content(p.id, "letter").await.unwrap();
        let loaded = PetitionStore::get(&store, p.id).await.unwrap();
        assert_eq!(loaded.generated_content.as_deref(), Some("letter"));

        let missing = PetitionStore::get(&store, Uuid::new_v4()).await;
        assert!(missing.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn job_lifecycle() {
        let store = MemoryStore::new();
        let mut job = GenerationJob::new(Uuid::new_v4(), &[Criterion::Awards]);
        JobStore::create(&store, &job).await.unwrap();

        store
            .update_status(job.id, JobStatus::InProgress)
            .await
            .unwrap();

        job.set_step_status("Drafting Awards Criterion", StepStatus::InProgress)
            .unwrap();
        store
            .update_progress(job.id, "Drafting Awards Criterion", &job.steps)
            .await
            .unwrap();

        let loaded = JobStore::get(&store, job.id).await.unwrap();
        assert_eq!(loaded.status, JobStatus::InProgress);
        assert_eq!(loaded.current_step.as_deref(), Some("Drafting Awards Criterion"));
        assert_eq!(loaded.steps[0].status, StepStatus::InProgress);

        store.mark_completed(job.id).await.unwrap();
        let loaded = JobStore::get(&store, job.id).await.unwrap();
        assert_eq!(loaded.status, JobStatus::Completed);
        assert!(loaded.completed_at.is_some());
    }

    #[tokio::test]
    async fn terminal_job_rejects_further_transitions() {
        let store = MemoryStore::new();
        let job = GenerationJob::new(Uuid::new_v4(), &[Criterion::Awards]);
        JobStore::create(&store, &job).await.unwrap();
        store
            .update_status(job.id, JobStatus::InProgress)
            .await
            .unwrap();
        store.mark_failed(job.id, "boom").await.unwrap();

        assert!(matches!(
            store.mark_completed(job.id).await,
            Err(StoreError::Job(_))
        ));
        let loaded = JobStore::get(&store, job.id).await.unwrap();
        assert_eq!(loaded.status, JobStatus::Failed);
        assert_eq!(loaded.error_message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn latest_job_for_petition() {
        let store = MemoryStore::new();
        let petition_id = Uuid::new_v4();
        let first = GenerationJob::new(petition_id, &[Criterion::Awards]);
        let mut second = GenerationJob::new(petition_id, &[Criterion::Awards]);
        second.created_at = first.created_at + chrono::Duration::seconds(5);
        JobStore::create(&store, &first).await.unwrap();
        JobStore::create(&store, &second).await.unwrap();

        let latest = store.latest_for_petition(petition_id).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
        assert!(
            store
                .latest_for_petition(Uuid::new_v4())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn search_orders_by_distance_and_limits() {
        let store = MemoryChunkStore::new();
        store.insert(
            chunk("far", SourceType::Regulation, Some(Criterion::Awards)),
            axis(1),
        );
        store.insert(
            chunk("near", SourceType::Regulation, Some(Criterion::Awards)),
            axis(0),
        );
        store.insert(
            chunk("middle", SourceType::Regulation, Some(Criterion::Awards)),
            blend(0, 1, 1.0),
        );

        let q = axis(0);
        let hits = store
            .search_by_criterion(&ChunkQuery::new(
                &q,
                Some(Criterion::Awards),
                SourceType::Regulation,
                2,
            ))
            .await
            .unwrap();
        let texts: Vec<&str> = hits.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["near", "middle"]);
        assert!(hits[0].distance.unwrap().abs() < 1e-6);
    }

    #[tokio::test]
    async fn search_filters_criterion_and_null_tag() {
        let store = MemoryChunkStore::new();
        store.insert(
            chunk("awards", SourceType::Regulation, Some(Criterion::Awards)),
            axis(0),
        );
        store.insert(
            chunk("judging", SourceType::Regulation, Some(Criterion::Judging)),
            axis(0),
        );
        store.insert(chunk("untagged", SourceType::Regulation, None), axis(0));

        let q = axis(0);
        let tagged = store
            .search_by_criterion(&ChunkQuery::new(
                &q,
                Some(Criterion::Judging),
                SourceType::Regulation,
                10,
            ))
            .await
            .unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0].text, "judging");

        let untagged = store
            .search_by_criterion(&ChunkQuery::new(&q, None, SourceType::Regulation, 10))
            .await
            .unwrap();
        assert_eq!(untagged.len(), 1);
        assert_eq!(untagged[0].text, "untagged");
    }

    #[tokio::test]
    async fn purity_filter_excludes_losing_arguments_and_dicta() {
        let store = MemoryChunkStore::new();
        let mut winning = chunk("winning", SourceType::AppealDecision, Some(Criterion::Awards));
        winning.is_winning_argument = true;
        let losing = chunk("losing", SourceType::AppealDecision, Some(Criterion::Awards));
        let mut holding = chunk("holding", SourceType::PrecedentCase, Some(Criterion::Awards));
        holding.is_holding = true;
        let dicta = chunk("dicta", SourceType::PrecedentCase, Some(Criterion::Awards));
        for c in [winning, losing, holding, dicta] {
            store.insert(c, axis(0));
        }

        let q = axis(0);
        let appeals = store
            .search_by_criterion(&ChunkQuery::new(
                &q,
                Some(Criterion::Awards),
                SourceType::AppealDecision,
                10,
            ))
            .await
            .unwrap();
        assert_eq!(appeals.len(), 1);
        assert_eq!(appeals[0].text, "winning");

        let cases = store
            .search_by_criterion(&ChunkQuery::new(
                &q,
                Some(Criterion::Awards),
                SourceType::PrecedentCase,
                10,
            ))
            .await
            .unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].text, "holding");

        let everything = store
            .search_by_criterion(
                &ChunkQuery::new(&q, Some(Criterion::Awards), SourceType::PrecedentCase, 10)
                    .with_purity(PurityFilter::Unfiltered),
            )
            .await
            .unwrap();
        assert_eq!(everything.len(), 2);
    }

    #[tokio::test]
    async fn wrong_dimension_rejected() {
        let store = MemoryChunkStore::new();
        let q = vec![1.0; 12];
        let err = store
            .search_by_criterion(&ChunkQuery::new(&q, None, SourceType::Regulation, 3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Dimension {
                expected: 768,
                got: 12
            }
        ));
    }

    #[test]
    fn cosine_distance_of_zero_vector() {
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
    }
}
