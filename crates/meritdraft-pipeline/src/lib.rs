//! Drafting pipeline: fact formatting, legal-context retrieval, section
//! generation, document assembly and the job state machine.

pub mod assembler;
mod catalog;
mod config;
pub mod facts;
mod generator;
mod orchestrator;
mod retriever;
mod worker;

#[cfg(test)]
mod testing;

pub use assembler::assemble;
pub use catalog::{CatalogEntry, CriterionCatalog};
pub use config::{PipelineConfig, RetrievalFailurePolicy, RetrievalLimits};
pub use generator::{DraftSection, SectionGenerator, collect_citations};
pub use orchestrator::{DraftError, DraftOrchestrator};
pub use retriever::{
    ContextRetriever, LegalContextRetriever, MeritsContext, RetrievedContext, build_query,
};
pub use worker::DraftWorker;
