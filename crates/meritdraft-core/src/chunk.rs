//! Legal knowledge-base records.
//!
//! Chunks are produced by the offline ingestion tool and only read here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::criterion::Criterion;

/// Dimensionality of query and document embeddings.
pub const EMBEDDING_DIM: usize = 768;

/// Partition of the legal knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Regulation,
    PrecedentCase,
    AppealDecision,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regulation => "regulation",
            Self::PrecedentCase => "precedent_case",
            Self::AppealDecision => "appeal_decision",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "regulation" => Ok(Self::Regulation),
            "precedent_case" => Ok(Self::PrecedentCase),
            "appeal_decision" => Ok(Self::AppealDecision),
            other => Err(format!("unknown source type: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalChunk {
    pub id: Uuid,
    pub text: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub source_document: String,
    #[serde(default)]
    pub regulatory_citation: Vec<String>,
    #[serde(default)]
    pub case_citation: Option<String>,
    #[serde(default)]
    pub appeal_citation: Option<String>,
    /// `None` for chunks that apply across criteria (final merits material).
    #[serde(default)]
    pub criterion_tag: Option<Criterion>,
    /// Named legal standard, e.g. "Kazarian two-part test".
    #[serde(default)]
    pub legal_standard: Option<String>,
    #[serde(default)]
    pub legal_test: Option<String>,
    #[serde(default)]
    pub is_winning_argument: bool,
    #[serde(default)]
    pub is_holding: bool,
    /// Cosine distance to the query vector; only set on search results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl LegalChunk {
    /// Whether the chunk may be cited as authority: appeal chunks must be
    /// winning arguments, precedent chunks must be holdings.
    pub fn is_citable(&self) -> bool {
        match self.source_type {
            SourceType::Regulation => true,
            SourceType::AppealDecision => self.is_winning_argument,
            SourceType::PrecedentCase => self.is_holding,
        }
    }

    /// The citation a drafted section should credit for this chunk.
    pub fn citation(&self) -> Option<&str> {
        match self.source_type {
            SourceType::AppealDecision => self.appeal_citation.as_deref(),
            SourceType::PrecedentCase => self.case_citation.as_deref(),
            SourceType::Regulation => self.regulatory_citation.first().map(String::as_str),
        }
    }
}
