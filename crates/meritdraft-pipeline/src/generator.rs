//! Prompt construction and section drafting.
//!
//! Each criterion section follows Issue, Rule, Analysis, Conclusion. The
//! applicant's facts are injected as a labelled block with an instruction
//! to reproduce every number exactly; the regulation paragraph falls back to
//! the catalog text when retrieval found none.

use std::fmt::Write;
use std::sync::Arc;

use meritdraft_ai::{AiError, CompletionClient};
use meritdraft_core::{Criterion, CriterionDetail, LegalChunk, MERITS_STEP, Petition};
use tracing::debug;

use crate::catalog::CriterionCatalog;
use crate::config::PipelineConfig;
use crate::facts;
use crate::retriever::{MeritsContext, RetrievedContext};

const KAZARIAN_CITATION: &str = "Kazarian v. USCIS, 596 F.3d 1115 (9th Cir. 2010)";
const CHAWATHE_CITATION: &str = "Matter of Chawathe, 25 I&N Dec. 369 (AAO 2010)";

const ROLE: &str = "You are an experienced immigration attorney preparing one section of a \
support letter for an extraordinary-ability petition. Write in formal legal English and use \
objective descriptors only.";

const TONE_RULES: &str = "\
- Do not use promotional or hyperbolic adjectives such as \"groundbreaking\", \"revolutionary\", \
\"world-renowned\" or \"esteemed\".
- Describe achievements with measurable, verifiable facts only.";

const FIDELITY_RULES: &str = "\
- Every number in the APPLICANT FACTS block (counts, citations, amounts, dates, rankings) must \
appear exactly as written there.
- Never estimate, round, sum, average or otherwise derive a number that is not in the block.
- Do not introduce facts that are absent from the block.";

/// One drafted section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftSection {
    pub title: String,
    pub content: String,
    pub citations: Vec<String>,
}

/// Regulatory citation first, then appeal citations, then case citations.
/// Duplicates keep their first position.
pub fn collect_citations(
    catalog: &CriterionCatalog,
    criterion: Criterion,
    ctx: &RetrievedContext,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let regulatory = catalog.citation(criterion);
    let retrieved = ctx
        .appeals
        .iter()
        .filter_map(|c| c.appeal_citation.as_deref())
        .chain(ctx.cases.iter().filter_map(|c| c.case_citation.as_deref()));
    for citation in std::iter::once(regulatory).chain(retrieved) {
        let citation = citation.trim();
        if !citation.is_empty() && !out.iter().any(|c| c == citation) {
            out.push(citation.to_string());
        }
    }
    out
}

fn join_text(chunks: &[LegalChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Drafts criterion and merits sections through a [`CompletionClient`].
pub struct SectionGenerator {
    completion: CompletionClient,
    catalog: Arc<CriterionCatalog>,
    criterion_temperature: f32,
    merits_temperature: f32,
}

impl SectionGenerator {
    pub fn new(
        completion: CompletionClient,
        catalog: Arc<CriterionCatalog>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            completion: completion.with_max_prompt_chars(config.max_prompt_chars),
            catalog,
            criterion_temperature: config.criterion_temperature,
            merits_temperature: config.merits_temperature,
        }
    }

    pub fn catalog(&self) -> &CriterionCatalog {
        &self.catalog
    }

    pub fn criterion_prompt(
        &self,
        petition: &Petition,
        criterion: Criterion,
        detail: &CriterionDetail,
        ctx: &RetrievedContext,
    ) -> String {
        let regulation = if ctx.regulations.is_empty() {
            self.catalog.regulation(criterion).to_string()
        } else {
            join_text(&ctx.regulations)
        };
        let appeals = join_text(&ctx.appeals);
        let citation = self.catalog.citation(criterion);
        let visa = petition.visa_type.as_str();

        let mut p = String::with_capacity(4096);
        let _ = writeln!(p, "{ROLE}\n");
        let _ = writeln!(
            p,
            "Draft the argument that the beneficiary, who works in {field}, satisfies the \
             \"{title}\" criterion for {visa} classification.\n",
            field = petition.field_of_expertise.trim(),
            title = self.catalog.title(criterion),
        );
        let _ = writeln!(p, "REGULATION:\n{regulation}\n");
        let _ = writeln!(p, "APPROVED APPEAL REASONING:\n{appeals}\n");
        let _ = writeln!(p, "APPLICANT FACTS:\n{}\n", facts::fact_block(detail));
        let _ = writeln!(p, "STRUCTURE:");
        let _ = writeln!(p, "1. Issue: one paragraph stating the legal requirement plainly.");
        let _ = writeln!(
            p,
            "2. Rule: one paragraph quoting the regulation above with the citation {citation}."
        );
        let _ = writeln!(
            p,
            "3. Analysis: three to four paragraphs applying the facts to the rule. Lead with {}. \
             Argue by analogy to the approved appeal reasoning, address the grounds on which \
             officers commonly deny this criterion, and tie each fact to the beneficiary's field.",
            facts::salient_fact(detail)
        );
        let _ = writeln!(
            p,
            "4. Conclusion: one paragraph stating that the criterion is satisfied.\n"
        );
        let _ = writeln!(p, "OUTPUT RULES:");
        let _ = writeln!(p, "- Five to seven paragraphs in total.");
        let _ = writeln!(p, "- Plain prose in the third person. No markdown.");
        let _ = writeln!(p, "- Do not write a heading or section title.");
        let _ = writeln!(
            p,
            "- End each sentence that relies on documentary evidence with an [Exhibit __] \
             placeholder."
        );
        let _ = writeln!(p, "{FIDELITY_RULES}");
        let _ = write!(p, "{TONE_RULES}");
        p
    }

    pub async fn generate_criterion(
        &self,
        petition: &Petition,
        criterion: Criterion,
        detail: &CriterionDetail,
        ctx: &RetrievedContext,
    ) -> Result<DraftSection, AiError> {
        let prompt = self.criterion_prompt(petition, criterion, detail, ctx);
        debug!(%criterion, chars = prompt.len(), "criterion prompt built");
        let content = self
            .completion
            .complete(&prompt, self.criterion_temperature)
            .await?;
        Ok(DraftSection {
            title: self.catalog.title(criterion).to_string(),
            content,
            citations: collect_citations(&self.catalog, criterion, ctx),
        })
    }

    pub fn merits_prompt(&self, petition: &Petition, ctx: &MeritsContext) -> String {
        let visa = petition.visa_type.as_str();
        let standard = join_text(&ctx.standard);
        let proof = join_text(&ctx.proof);

        let mut evidence = String::new();
        for criterion in petition.drafting_criteria() {
            let _ = writeln!(evidence, "{}:", self.catalog.title(criterion));
            if let Some(detail) = petition.criteria_details.get(criterion) {
                let _ = writeln!(evidence, "{}", facts::fact_block(detail));
            }
            evidence.push('\n');
        }

        let mut p = String::with_capacity(4096);
        let _ = writeln!(p, "{ROLE}\n");
        let _ = writeln!(
            p,
            "Draft the final merits determination for the {visa} petition of a beneficiary \
             who works in {}. The individual criteria have already been argued; this section \
             weighs the evidence as a whole.\n",
            petition.field_of_expertise.trim()
        );
        let _ = writeln!(p, "TWO-STEP STANDARD ({KAZARIAN_CITATION}):\n{standard}\n");
        let _ = writeln!(p, "STANDARD OF PROOF ({CHAWATHE_CITATION}):\n{proof}\n");
        let _ = writeln!(p, "EVIDENCE BY CRITERION:\n{evidence}");
        let _ = writeln!(p, "STRUCTURE:");
        let _ = writeln!(
            p,
            "1. Open with the preponderance of the evidence standard under {CHAWATHE_CITATION}."
        );
        let _ = writeln!(
            p,
            "2. Restate the two-step analysis: the regulatory criteria are counted first, then \
             the evidence is weighed in its totality."
        );
        let _ = writeln!(
            p,
            "3. Synthesise the evidence above without repeating the criterion sections, and \
             show how the criteria reinforce one another."
        );
        let _ = writeln!(
            p,
            "4. Close by reaffirming that the beneficiary meets the standard by a \
             preponderance of the evidence.\n"
        );
        let _ = writeln!(p, "OUTPUT RULES:");
        let _ = writeln!(p, "- Six to eight paragraphs in total.");
        let _ = writeln!(p, "- Plain prose in the third person. No markdown.");
        let _ = writeln!(p, "- Do not write a heading or section title.");
        let _ = writeln!(
            p,
            "- Cite {KAZARIAN_CITATION} and {CHAWATHE_CITATION} where the standard is stated."
        );
        let _ = writeln!(p, "{FIDELITY_RULES}");
        let _ = write!(p, "{TONE_RULES}");
        p
    }

    pub async fn generate_merits(
        &self,
        petition: &Petition,
        ctx: &MeritsContext,
    ) -> Result<DraftSection, AiError> {
        let prompt = self.merits_prompt(petition, ctx);
        debug!(chars = prompt.len(), "merits prompt built");
        let content = self
            .completion
            .complete(&prompt, self.merits_temperature)
            .await?;
        Ok(DraftSection {
            title: MERITS_STEP.to_string(),
            content,
            citations: vec![KAZARIAN_CITATION.to_string(), CHAWATHE_CITATION.to_string()],
        })
    }
}
