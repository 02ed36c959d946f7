//! The applicant case a support letter is drafted for.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::criterion::Criterion;
use crate::details::CriteriaDetails;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PetitionStatus {
    #[default]
    Draft,
    InProgress,
    Completed,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VisaType {
    #[default]
    #[serde(rename = "O-1A")]
    O1A,
    #[serde(rename = "EB-1A")]
    Eb1A,
}

impl VisaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::O1A => "O-1A",
            Self::Eb1A => "EB-1A",
        }
    }
}

/// An applicant case.
///
/// The drafting pipeline reads petitions and only ever writes back
/// `generated_content` (and `refine_instructions` when a regeneration is
/// requested).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Petition {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub status: PetitionStatus,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub visa_type: VisaType,
    #[serde(default)]
    pub petitioner_name: String,
    #[serde(default)]
    pub field_of_expertise: String,
    /// Uploaded CV, by opaque file-store id. Never read by the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cv_file_id: Option<Uuid>,
    /// Selected criteria in the order they are drafted.
    #[serde(default)]
    pub selected_criteria: Vec<Criterion>,
    #[serde(default)]
    pub criteria_details: CriteriaDetails,
    #[serde(default)]
    pub generated_content: Option<String>,
    #[serde(default)]
    pub refine_instructions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Petition {
    /// A blank draft petition owned by `user_id`.
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            status: PetitionStatus::Draft,
            client_name: String::new(),
            visa_type: VisaType::default(),
            petitioner_name: String::new(),
            field_of_expertise: String::new(),
            cv_file_id: None,
            selected_criteria: Vec::new(),
            criteria_details: CriteriaDetails::new(),
            generated_content: None,
            refine_instructions: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Names of the prerequisites for drafting that are still missing.
    ///
    /// Empty when the petition is ready: client name, field of expertise,
    /// at least one selected criterion, and non-empty criteria details.
    pub fn missing_requirements(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.client_name.trim().is_empty() {
            missing.push("client_name");
        }
        if self.field_of_expertise.trim().is_empty() {
            missing.push("field_of_expertise");
        }
        if self.selected_criteria.is_empty() {
            missing.push("selected_criteria");
        }
        if self.criteria_details.is_empty() {
            missing.push("criteria_details");
        }
        missing
    }

    /// Selected criteria in drafting order, each listed once. A repeated
    /// criterion keeps its first position.
    pub fn drafting_criteria(&self) -> Vec<Criterion> {
        let mut seen = Vec::with_capacity(self.selected_criteria.len());
        for &c in &self.selected_criteria {
            if !seen.contains(&c) {
                seen.push(c);
            }
        }
        seen
    }

    pub fn is_ready_for_generation(&self) -> bool {
        self.missing_requirements().is_empty()
    }
}
