//! Generation jobs: one run of the drafting pipeline for a petition.
//!
//! A job owns an ordered list of named steps: one per selected criterion,
//! then [`MERITS_STEP`] and [`ASSEMBLY_STEP`]. The list is fixed at creation;
//! afterwards only step statuses and the current-step pointer change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::criterion::Criterion;

pub const MERITS_STEP: &str = "Final Merits Determination";
pub const ASSEMBLY_STEP: &str = "Assembling Document";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Legal transitions: pending → in_progress → {completed, failed}.
    /// A pending job may also fail directly (e.g. its petition vanished).
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::Pending, Self::Failed)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStep {
    pub name: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GenerationStep {
    fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Pending,
            description: None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("job cannot move from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
    #[error("unknown step: {0}")]
    UnknownStep(String),
    #[error("step {name} cannot move from {from:?} to {to:?}")]
    InvalidStepTransition {
        name: String,
        from: StepStatus,
        to: StepStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: Uuid,
    pub petition_id: Uuid,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    pub steps: Vec<GenerationStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    /// A pending job with one step per criterion plus the two trailing steps.
    pub fn new(petition_id: Uuid, criteria: &[Criterion]) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            petition_id,
            status: JobStatus::Pending,
            current_step: None,
            steps: plan_steps(criteria),
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn step(&self, name: &str) -> Option<&GenerationStep> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// The step currently marked in progress, if any.
    pub fn active_step(&self) -> Option<&GenerationStep> {
        self.steps
            .iter()
            .find(|s| s.status == StepStatus::InProgress)
    }

    /// Move the job to `next`, stamping timestamps.
    pub fn transition(&mut self, next: JobStatus) -> Result<(), JobError> {
        if !self.status.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        let now = Utc::now();
        self.status = next;
        self.updated_at = now;
        if next == JobStatus::Completed {
            self.completed_at = Some(now);
        }
        Ok(())
    }

    /// Move the job to `failed`, recording `message`.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), JobError> {
        self.transition(JobStatus::Failed)?;
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Update one step's status. Marking a step in progress also moves the
    /// current-step pointer to it.
    pub fn set_step_status(&mut self, name: &str, status: StepStatus) -> Result<(), JobError> {
        let step = self
            .steps
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| JobError::UnknownStep(name.to_string()))?;
        if !step.status.can_transition_to(status) {
            return Err(JobError::InvalidStepTransition {
                name: name.to_string(),
                from: step.status,
                to: status,
            });
        }
        step.status = status;
        if status == StepStatus::InProgress {
            self.current_step = Some(name.to_string());
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Step list for a job drafting `criteria`, in drafting order. A repeated
/// criterion gets a single step.
pub fn plan_steps(criteria: &[Criterion]) -> Vec<GenerationStep> {
    let mut seen: Vec<Criterion> = Vec::with_capacity(criteria.len());
    criteria
        .iter()
        .filter(|c| {
            let first = !seen.contains(*c);
            if first {
                seen.push(**c);
            }
            first
        })
        .map(|c| GenerationStep::pending(c.step_name()))
        .chain([
            GenerationStep::pending(MERITS_STEP),
            GenerationStep::pending(ASSEMBLY_STEP),
        ])
        .collect()
}
