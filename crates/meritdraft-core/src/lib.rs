pub mod chunk;
pub mod criterion;
pub mod details;
pub mod field;
pub mod job;
pub mod petition;
pub mod schema;

pub use chunk::{EMBEDDING_DIM, LegalChunk, SourceType};
pub use criterion::{Criterion, UnknownCriterion};
pub use details::{CriteriaDetails, CriterionDetail, DetailError, FactValue, Quantity};
pub use field::sanitize_field;
pub use job::{
    ASSEMBLY_STEP, GenerationJob, GenerationStep, JobError, JobStatus, MERITS_STEP, StepStatus,
    plan_steps,
};
pub use petition::{Petition, PetitionStatus, VisaType};
pub use schema::legal;
