//! Job lifecycle: create a pending job synchronously, then process it to a
//! terminal state.
//!
//! Processing is sequential over the petition's selected criteria. Any
//! failure aborts the run: the active step is marked failed, the job moves
//! to `failed` with a readable message, and the petition's generated content
//! is left untouched.

use std::sync::Arc;

use meritdraft_ai::AiError;
use meritdraft_core::{
    ASSEMBLY_STEP, Criterion, GenerationJob, JobError, JobStatus, MERITS_STEP, Petition,
    StepStatus,
};
use meritdraft_store::{JobStore, PetitionStore, StoreError};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::assembler;
use crate::config::{PipelineConfig, RetrievalFailurePolicy};
use crate::facts;
use crate::generator::{DraftSection, SectionGenerator};
use crate::retriever::{ContextRetriever, MeritsContext, RetrievedContext};

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("petition is missing required data: {}", .0.join(", "))]
    MissingData(Vec<&'static str>),

    #[error("petition not found")]
    PetitionNotFound(Uuid),

    #[error("generation job not found")]
    JobNotFound(Uuid),

    #[error("job has already been started (status: {})", .0.as_str())]
    AlreadyStarted(JobStatus),

    #[error("missing details for criterion: {0}")]
    MissingDetails(Criterion),

    #[error("failed to retrieve legal context for {criterion}: {source}")]
    Retrieval {
        criterion: Criterion,
        #[source]
        source: AiError,
    },

    #[error("failed to generate section for {criterion}: {source}")]
    Section {
        criterion: Criterion,
        #[source]
        source: AiError,
    },

    #[error("failed to retrieve final merits context: {0}")]
    MeritsRetrieval(#[source] AiError),

    #[error("failed to generate final merits: {0}")]
    Merits(#[source] AiError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("storage error: {0}")]
    Store(#[source] StoreError),

    #[error("draft worker has shut down")]
    WorkerClosed,
}

impl From<StoreError> for DraftError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::PetitionNotFound(id) => Self::PetitionNotFound(id),
            StoreError::JobNotFound(id) => Self::JobNotFound(id),
            other => Self::Store(other),
        }
    }
}

pub struct DraftOrchestrator {
    petitions: Arc<dyn PetitionStore>,
    jobs: Arc<dyn JobStore>,
    retriever: Arc<dyn ContextRetriever>,
    generator: Arc<SectionGenerator>,
    config: PipelineConfig,
}

impl DraftOrchestrator {
    pub fn new(
        petitions: Arc<dyn PetitionStore>,
        jobs: Arc<dyn JobStore>,
        retriever: Arc<dyn ContextRetriever>,
        generator: Arc<SectionGenerator>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            petitions,
            jobs,
            retriever,
            generator,
            config,
        }
    }

    /// Validate the petition and persist a pending job. No network calls.
    ///
    /// Non-blank `refine_instructions` are stored on the petition. A criterion
    /// selected more than once is kept at its first position only.
    pub async fn create(
        &self,
        petition_id: Uuid,
        refine_instructions: Option<String>,
    ) -> Result<GenerationJob, DraftError> {
        let mut petition = self.petitions.get(petition_id).await?;
        let missing = petition.missing_requirements();
        if !missing.is_empty() {
            return Err(DraftError::MissingData(missing));
        }

        let mut changed = false;
        let criteria = petition.drafting_criteria();
        if criteria.len() != petition.selected_criteria.len() {
            warn!(petition_id = %petition.id, "dropping repeated criteria from selection");
            petition.selected_criteria = criteria;
            changed = true;
        }
        if let Some(refine) = refine_instructions.filter(|r| !r.trim().is_empty()) {
            petition.refine_instructions = Some(refine);
            changed = true;
        }
        if changed {
            self.petitions.update(&petition).await?;
        }

        let job = GenerationJob::new(petition.id, &petition.selected_criteria);
        self.jobs.create(&job).await?;
        info!(job_id = %job.id, petition_id = %petition.id, steps = job.steps.len(), "generation job created");
        Ok(job)
    }

    pub async fn get_status(&self, job_id: Uuid) -> Result<GenerationJob, DraftError> {
        Ok(self.jobs.get(job_id).await?)
    }

    pub async fn latest_for_petition(
        &self,
        petition_id: Uuid,
    ) -> Result<Option<GenerationJob>, DraftError> {
        Ok(self.jobs.latest_for_petition(petition_id).await?)
    }

    /// Run a pending job to completion or failure.
    ///
    /// The returned error is the one recorded on the job; a job that is not
    /// pending is rejected without being touched.
    pub async fn process(&self, job_id: Uuid) -> Result<(), DraftError> {
        let mut job = self.jobs.get(job_id).await?;
        if job.status != JobStatus::Pending {
            return Err(DraftError::AlreadyStarted(job.status));
        }

        match self.run(&mut job).await {
            Ok(()) => {
                info!(job_id = %job.id, "generation job completed");
                Ok(())
            }
            Err(e) => {
                self.record_failure(&mut job, &e).await;
                Err(e)
            }
        }
    }

    async fn run(&self, job: &mut GenerationJob) -> Result<(), DraftError> {
        let petition = self.petitions.get(job.petition_id).await?;

        self.jobs.update_status(job.id, JobStatus::InProgress).await?;
        job.transition(JobStatus::InProgress)?;
        let criteria = petition.drafting_criteria();
        info!(job_id = %job.id, criteria = criteria.len(), "generation job started");

        let mut sections = Vec::with_capacity(criteria.len());
        for criterion in criteria {
            let step = criterion.step_name();
            self.set_step(job, &step, StepStatus::InProgress).await?;
            let section = self.draft_criterion(&petition, criterion).await?;
            self.set_step(job, &step, StepStatus::Completed).await?;
            info!(
                job_id = %job.id,
                %criterion,
                citations = ?section.citations,
                "criterion section drafted"
            );
            sections.push(section);
        }

        self.set_step(job, MERITS_STEP, StepStatus::InProgress).await?;
        let merits = self.draft_merits(&petition).await?;
        self.set_step(job, MERITS_STEP, StepStatus::Completed).await?;

        self.set_step(job, ASSEMBLY_STEP, StepStatus::InProgress).await?;
        let document = assembler::assemble(&petition, &sections, &merits);
        self.set_step(job, ASSEMBLY_STEP, StepStatus::Completed).await?;

        // The document is the last thing written before the job completes.
        self.petitions
            .set_generated_content(petition.id, &document)
            .await?;
        if let Err(e) = self.jobs.mark_completed(job.id).await {
            self.restore_content(petition.id, petition.generated_content.clone())
                .await;
            return Err(e.into());
        }
        job.transition(JobStatus::Completed)?;
        Ok(())
    }

    /// Put back the content a petition had before this run. Best effort.
    async fn restore_content(&self, petition_id: Uuid, previous: Option<String>) {
        let result = match self.petitions.get(petition_id).await {
            Ok(mut current) => {
                current.generated_content = previous;
                self.petitions.update(&current).await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            error!(%petition_id, error = %e, "could not restore previous generated content");
        }
    }

    async fn draft_criterion(
        &self,
        petition: &Petition,
        criterion: Criterion,
    ) -> Result<DraftSection, DraftError> {
        let detail = petition
            .criteria_details
            .get(criterion)
            .ok_or(DraftError::MissingDetails(criterion))?;

        let summary = facts::summary(detail);
        let ctx = match self
            .retriever
            .retrieve(criterion, &petition.field_of_expertise, &summary)
            .await
        {
            Ok(ctx) => ctx,
            Err(source) => match self.config.on_retrieval_error {
                RetrievalFailurePolicy::Abort => {
                    return Err(DraftError::Retrieval { criterion, source });
                }
                RetrievalFailurePolicy::ContinueEmpty => {
                    warn!(%criterion, error = %source, "retrieval failed, drafting without legal context");
                    RetrievedContext::default()
                }
            },
        };

        self.generator
            .generate_criterion(petition, criterion, detail, &ctx)
            .await
            .map_err(|source| DraftError::Section { criterion, source })
    }

    async fn draft_merits(&self, petition: &Petition) -> Result<DraftSection, DraftError> {
        let ctx = match self
            .retriever
            .retrieve_merits(&petition.field_of_expertise)
            .await
        {
            Ok(ctx) => ctx,
            Err(e) => match self.config.on_retrieval_error {
                RetrievalFailurePolicy::Abort => return Err(DraftError::MeritsRetrieval(e)),
                RetrievalFailurePolicy::ContinueEmpty => {
                    warn!(error = %e, "merits retrieval failed, drafting without legal context");
                    MeritsContext::default()
                }
            },
        };

        self.generator
            .generate_merits(petition, &ctx)
            .await
            .map_err(DraftError::Merits)
    }

    async fn set_step(
        &self,
        job: &mut GenerationJob,
        name: &str,
        status: StepStatus,
    ) -> Result<(), DraftError> {
        job.set_step_status(name, status)?;
        self.jobs.update_progress(job.id, name, &job.steps).await?;
        Ok(())
    }

    /// Best effort: failures while recording a failure are only logged.
    async fn record_failure(&self, job: &mut GenerationJob, cause: &DraftError) {
        error!(job_id = %job.id, error = %cause, "generation job failed");

        if let Some(active) = job.active_step().map(|s| s.name.clone()) {
            if let Err(e) = self.set_step(job, &active, StepStatus::Failed).await {
                warn!(job_id = %job.id, step = %active, error = %e, "could not mark step failed");
            }
        }
        if let Err(e) = self.jobs.mark_failed(job.id, &cause.to_string()).await {
            error!(job_id = %job.id, error = %e, "could not mark job failed");
        }
    }
}
