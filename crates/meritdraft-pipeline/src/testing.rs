//! Fakes shared by the orchestrator and worker tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use meritdraft_ai::{AiError, CompletionBackend, CompletionClient, RetryPolicy};
use meritdraft_core::{
    CriteriaDetails, Criterion, GenerationJob, GenerationStep, JobStatus, Petition,
};
use meritdraft_store::{JobStore, MemoryStore, PetitionStore, StoreError};
use parking_lot::Mutex;
use serde_json::json;
use uuid::Uuid;

use crate::catalog::CriterionCatalog;
use crate::config::PipelineConfig;
use crate::generator::SectionGenerator;
use crate::orchestrator::DraftOrchestrator;
use crate::retriever::{ContextRetriever, MeritsContext, RetrievedContext};

/// Returns empty context, or fails every criterion retrieval when `fail` is
/// set.
#[derive(Default)]
pub struct EmptyRetriever {
    pub fail: bool,
}

#[async_trait]
impl ContextRetriever for EmptyRetriever {
    async fn retrieve(
        &self,
        _criterion: Criterion,
        _field: &str,
        _summary: &str,
    ) -> Result<RetrievedContext, AiError> {
        if self.fail {
            return Err(AiError::EmbeddingFailed {
                attempts: 3,
                source: Box::new(AiError::Server {
                    status: 503,
                    body: "unavailable".into(),
                }),
            });
        }
        Ok(RetrievedContext::default())
    }

    async fn retrieve_merits(&self, _field: &str) -> Result<MeritsContext, AiError> {
        Ok(MeritsContext::default())
    }
}

/// Placeholder text for every prompt except those containing `fail_on`,
/// which get a 503.
#[derive(Default)]
pub struct Placeholder {
    pub fail_on: Option<&'static str>,
    pub calls: Mutex<usize>,
}

#[async_trait]
impl CompletionBackend for Placeholder {
    async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String, AiError> {
        *self.calls.lock() += 1;
        if self.fail_on.is_some_and(|needle| prompt.contains(needle)) {
            return Err(AiError::Server {
                status: 503,
                body: "overloaded".into(),
            });
        }
        Ok("Placeholder section text.".into())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub backend: Arc<Placeholder>,
    pub orchestrator: Arc<DraftOrchestrator>,
}

/// Job store whose `mark_completed` always fails; everything else goes to
/// the wrapped store.
pub struct CompletionRefused(pub Arc<MemoryStore>);

#[async_trait]
impl JobStore for CompletionRefused {
    async fn create(&self, job: &GenerationJob) -> Result<(), StoreError> {
        JobStore::create(self.0.as_ref(), job).await
    }

    async fn get(&self, id: Uuid) -> Result<GenerationJob, StoreError> {
        JobStore::get(self.0.as_ref(), id).await
    }

    async fn latest_for_petition(
        &self,
        petition_id: Uuid,
    ) -> Result<Option<GenerationJob>, StoreError> {
        self.0.latest_for_petition(petition_id).await
    }

    async fn update_status(&self, id: Uuid, status: JobStatus) -> Result<(), StoreError> {
        self.0.update_status(id, status).await
    }

    async fn update_progress(
        &self,
        id: Uuid,
        current_step: &str,
        steps: &[GenerationStep],
    ) -> Result<(), StoreError> {
        self.0.update_progress(id, current_step, steps).await
    }

    async fn mark_failed(&self, id: Uuid, message: &str) -> Result<(), StoreError> {
        self.0.mark_failed(id, message).await
    }

    async fn mark_completed(&self, _id: Uuid) -> Result<(), StoreError> {
        Err(StoreError::Other("disk full".into()))
    }
}

impl Harness {
    pub fn new(backend: Placeholder, retriever: EmptyRetriever, config: PipelineConfig) -> Self {
        Self::build(backend, retriever, config, |store| store as Arc<dyn JobStore>)
    }

    /// Like [`Harness::new`], with the job store wrapped by `jobs`.
    pub fn build(
        backend: Placeholder,
        retriever: EmptyRetriever,
        config: PipelineConfig,
        jobs: impl FnOnce(Arc<MemoryStore>) -> Arc<dyn JobStore>,
    ) -> Self {
        let store = Arc::new(MemoryStore::new());
        let backend = Arc::new(backend);
        let completion =
            CompletionClient::new(backend.clone(), RetryPolicy::new(3, Duration::ZERO).unwrap());
        let generator = Arc::new(SectionGenerator::new(
            completion,
            Arc::new(CriterionCatalog::default()),
            &config,
        ));
        let orchestrator = Arc::new(DraftOrchestrator::new(
            store.clone(),
            jobs(store.clone()),
            Arc::new(retriever),
            generator,
            config,
        ));
        Self {
            store,
            backend,
            orchestrator,
        }
    }

    pub fn default_setup() -> Self {
        Self::new(
            Placeholder::default(),
            EmptyRetriever::default(),
            PipelineConfig::default(),
        )
    }

    pub async fn store_petition(&self, petition: &Petition) {
        PetitionStore::create(self.store.as_ref(), petition)
            .await
            .unwrap();
    }

    pub async fn petition(&self, id: Uuid) -> Petition {
        PetitionStore::get(self.store.as_ref(), id).await.unwrap()
    }

    pub fn completion_calls(&self) -> usize {
        *self.backend.calls.lock()
    }
}

/// Awards and judging, both with details.
pub fn ready_petition() -> Petition {
    let mut p = Petition::new(Uuid::new_v4());
    p.client_name = "Dr. Ada Park".into();
    p.field_of_expertise = "Machine Learning".into();
    p.selected_criteria = vec![Criterion::Awards, Criterion::Judging];
    p.criteria_details = CriteriaDetails::from_value(json!({
        "awards": {"awards": [{"name": "Best Paper Award", "date": "2023"}]},
        "judging": {"venue": "ICML", "role": "Area Chair", "papers_reviewed": 42}
    }))
    .unwrap();
    p
}
