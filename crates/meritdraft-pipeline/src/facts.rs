//! Views over an applicant's criterion details.
//!
//! [`summary`] is a terse, space-joined string for embedding queries.
//! [`fact_block`] is the labelled multi-line rendering injected into prompts.
//! Numbers are printed as the text [`Quantity`] kept for them, so a citation
//! count of `89` (integer or float) always renders as `89`.

use std::fmt::Write;

use meritdraft_core::details::{
    AuthorshipDetail, AwardsDetail, ContributionsDetail, GenericDetail, JudgingDetail,
};
use meritdraft_core::{CriterionDetail, Quantity};

const FALLBACK_SALIENT_FACT: &str = "their achievements in the field";

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Names, titles and counts joined by single spaces.
pub fn summary(detail: &CriterionDetail) -> String {
    let mut terms: Vec<String> = Vec::new();
    let mut push = |s: Option<&str>| {
        if let Some(s) = s {
            terms.push(s.to_string());
        }
    };

    match detail {
        CriterionDetail::Awards(d) => {
            for award in &d.awards {
                push(non_empty(&award.name));
                push(non_empty(&award.description));
            }
        }
        CriterionDetail::Judging(d) => {
            push(non_empty(&d.venue));
            push(non_empty(&d.role));
            if let Some(n) = &d.papers_reviewed {
                push(Some(format!("{n} papers reviewed").as_str()));
            }
        }
        CriterionDetail::Authorship(d) => {
            for p in &d.publications {
                push(non_empty(&p.title));
                push(non_empty(&p.journal));
                if let Some(n) = &p.citations {
                    push(Some(format!("{n} citations").as_str()));
                }
            }
        }
        CriterionDetail::OriginalContributions(d) => {
            for c in &d.contributions {
                push(non_empty(&c.title));
                push(non_empty(&c.impact));
            }
        }
        CriterionDetail::Generic(d) => push(non_empty(&d.description)),
    }

    terms.join(" ")
}

/// Labelled, numerically exact rendering of the facts for one criterion.
pub fn fact_block(detail: &CriterionDetail) -> String {
    match detail {
        CriterionDetail::Awards(d) => awards_block(d),
        CriterionDetail::Judging(d) => judging_block(d),
        CriterionDetail::Authorship(d) => authorship_block(d),
        CriterionDetail::OriginalContributions(d) => contributions_block(d),
        CriterionDetail::Generic(d) => generic_block(d),
    }
}

/// The single fact the analysis paragraph should lead with.
pub fn salient_fact(detail: &CriterionDetail) -> String {
    let fact = match detail {
        CriterionDetail::Awards(d) => d
            .awards
            .first()
            .and_then(|a| non_empty(&a.name))
            .map(String::from),
        CriterionDetail::Judging(d) => non_empty(&d.venue).map(|venue| {
            let role = non_empty(&d.role).unwrap_or("a reviewer");
            format!("serving as {role} at {venue}")
        }),
        CriterionDetail::Authorship(d) => d
            .publications
            .first()
            .and_then(|p| non_empty(&p.title))
            .map(String::from),
        CriterionDetail::OriginalContributions(d) => d
            .contributions
            .first()
            .and_then(|c| non_empty(&c.title))
            .map(String::from),
        CriterionDetail::Generic(_) => None,
    };
    fact.unwrap_or_else(|| FALLBACK_SALIENT_FACT.to_string())
}

/// Append `\n<label>: <value>` when the value is present.
fn line(out: &mut String, label: &str, value: Option<&str>) {
    if let Some(v) = value {
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = write!(out, "{label}: {v}");
    }
}

fn quantity_line(out: &mut String, label: &str, value: Option<&Quantity>) {
    line(out, label, value.map(Quantity::as_str));
}

fn awards_block(d: &AwardsDetail) -> String {
    let mut entries = Vec::with_capacity(d.awards.len());
    for award in &d.awards {
        let mut out = String::new();
        match (non_empty(&award.name), non_empty(&award.date)) {
            (Some(name), Some(date)) => {
                let _ = write!(out, "Award: {name} (Date: {date})");
            }
            (Some(name), None) => {
                let _ = write!(out, "Award: {name}");
            }
            (None, date) => line(&mut out, "Date", date),
        }
        line(&mut out, "Description", non_empty(&award.description));
        line(&mut out, "Significance", non_empty(&award.importance));
        line(&mut out, "Impact", non_empty(&award.impact));
        entries.push(out);
    }
    entries.join("\n")
}

fn judging_block(d: &JudgingDetail) -> String {
    let mut out = String::new();
    line(&mut out, "Venue", non_empty(&d.venue));
    line(&mut out, "Role", non_empty(&d.role));
    quantity_line(&mut out, "Papers Reviewed", d.papers_reviewed.as_ref());
    line(&mut out, "Significance", non_empty(&d.importance));
    line(&mut out, "Impact", non_empty(&d.impact));
    out
}

fn authorship_block(d: &AuthorshipDetail) -> String {
    let mut entries = Vec::with_capacity(d.publications.len());
    for (i, p) in d.publications.iter().enumerate() {
        let mut out = format!("Publication {}:", i + 1);
        line(&mut out, "Title", non_empty(&p.title));
        line(&mut out, "Journal", non_empty(&p.journal));
        quantity_line(
            &mut out,
            "Impact Factor",
            p.impact_factor.as_ref().filter(|q| q.value() > 0.0),
        );
        quantity_line(&mut out, "Citations", p.citations.as_ref());
        line(&mut out, "Significance", non_empty(&p.importance));
        line(&mut out, "Impact", non_empty(&p.impact));
        entries.push(out);
    }
    entries.join("\n\n")
}

fn contributions_block(d: &ContributionsDetail) -> String {
    let mut entries = Vec::with_capacity(d.contributions.len());
    for (i, c) in d.contributions.iter().enumerate() {
        let mut out = format!("Contribution {}:", i + 1);
        line(&mut out, "Title", non_empty(&c.title));
        line(&mut out, "Description", non_empty(&c.description));
        line(&mut out, "Significance", non_empty(&c.importance));
        line(&mut out, "Impact", non_empty(&c.impact));
        entries.push(out);
    }
    entries.join("\n\n")
}

fn generic_block(d: &GenericDetail) -> String {
    let mut out = String::new();
    if let Some(desc) = non_empty(&d.description) {
        out.push_str(desc);
    }
    for (key, value) in &d.other {
        if value.is_blank() {
            continue;
        }
        line(&mut out, &label_for(key), Some(value.to_string().as_str()));
    }
    line(&mut out, "Significance", non_empty(&d.importance));
    line(&mut out, "Impact", non_empty(&d.impact));
    out
}

/// `annual_salary` → `Annual Salary`.
fn label_for(key: &str) -> String {
    key.split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
