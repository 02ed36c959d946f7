//! The ten regulatory evidentiary criteria an O-1A / EB-1A applicant can satisfy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A regulatory evidentiary category (8 C.F.R. § 214.2(o)(3)(iii)(A)–(J)).
///
/// Serialises as the snake_case identifier used by clients and by the
/// `criterion_tag` column of the legal knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Awards,
    Membership,
    MediaCoverage,
    Judging,
    OriginalContributions,
    Authorship,
    Exhibitions,
    CriticalRole,
    HighSalary,
    CommercialSuccess,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown criterion: {0:?}")]
pub struct UnknownCriterion(pub String);

impl Criterion {
    /// All criteria in regulatory order (A through J).
    pub const ALL: [Criterion; 10] = [
        Criterion::Awards,
        Criterion::Membership,
        Criterion::MediaCoverage,
        Criterion::Judging,
        Criterion::OriginalContributions,
        Criterion::Authorship,
        Criterion::Exhibitions,
        Criterion::CriticalRole,
        Criterion::HighSalary,
        Criterion::CommercialSuccess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Awards => "awards",
            Self::Membership => "membership",
            Self::MediaCoverage => "media_coverage",
            Self::Judging => "judging",
            Self::OriginalContributions => "original_contributions",
            Self::Authorship => "authorship",
            Self::Exhibitions => "exhibitions",
            Self::CriticalRole => "critical_role",
            Self::HighSalary => "high_salary",
            Self::CommercialSuccess => "commercial_success",
        }
    }

    /// Short human-readable label ("Media Coverage").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Awards => "Awards",
            Self::Membership => "Membership",
            Self::MediaCoverage => "Media Coverage",
            Self::Judging => "Judging",
            Self::OriginalContributions => "Original Contributions",
            Self::Authorship => "Authorship",
            Self::Exhibitions => "Exhibitions",
            Self::CriticalRole => "Critical Role",
            Self::HighSalary => "High Salary",
            Self::CommercialSuccess => "Commercial Success",
        }
    }

    /// Name of the generation step that drafts this criterion.
    pub fn step_name(&self) -> String {
        format!("Drafting {} Criterion", self.label())
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Criterion {
    type Err = UnknownCriterion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownCriterion(s.to_string()))
    }
}
