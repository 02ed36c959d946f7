/// Per-partition result limits for legal-context retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalLimits {
    pub regulations: usize,
    pub appeals: usize,
    pub cases: usize,
    /// Limit for each of the two final-merits searches.
    pub merits: usize,
}

impl Default for RetrievalLimits {
    fn default() -> Self {
        Self {
            regulations: 3,
            appeals: 3,
            cases: 2,
            merits: 5,
        }
    }
}

/// What the orchestrator does when retrieval itself fails (the query could
/// not be embedded). Per-partition search failures never reach this point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetrievalFailurePolicy {
    /// Fail the job.
    #[default]
    Abort,
    /// Log a warning and draft from an empty context. Regulation text falls
    /// back to the catalog paragraph.
    ContinueEmpty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub limits: RetrievalLimits,
    pub criterion_temperature: f32,
    pub merits_temperature: f32,
    pub max_prompt_chars: usize,
    pub on_retrieval_error: RetrievalFailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            limits: RetrievalLimits::default(),
            criterion_temperature: 0.2,
            merits_temperature: 0.3,
            max_prompt_chars: 30_000,
            on_retrieval_error: RetrievalFailurePolicy::Abort,
        }
    }
}
