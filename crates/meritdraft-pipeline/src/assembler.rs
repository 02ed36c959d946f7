//! Deterministic assembly of the final petition document.

use std::fmt::Write;

use meritdraft_core::Petition;

use crate::generator::DraftSection;

const MERITS_LEAD_IN: &str = "final merits determination";

/// Concatenate the fixed sections with the drafted criterion and merits
/// sections into plain text.
pub fn assemble(petition: &Petition, sections: &[DraftSection], merits: &DraftSection) -> String {
    let visa = petition.visa_type.as_str();
    let qualifications = petition
        .drafting_criteria()
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ");

    let mut doc = String::new();
    let _ = write!(doc, "PETITION FOR {visa} VISA\n\n");
    let _ = write!(
        doc,
        "I. INTRODUCTION\n{}, in the field of {}\n\n",
        petition.client_name.trim(),
        petition.field_of_expertise.trim()
    );
    let _ = write!(
        doc,
        "II. QUALIFICATIONS SUMMARY\nThe client has satisfied the following criteria: {qualifications}\n\n"
    );

    doc.push_str("III. REGULATORY CRITERIA\n\n");
    for section in sections {
        if !starts_with_title(&section.content, &section.title) {
            doc.push_str(&section.title);
            doc.push('\n');
        }
        doc.push_str(&section.content);
        doc.push_str("\n\n");
    }

    doc.push_str("IV. FINAL MERITS DETERMINATION\n");
    doc.push_str(strip_merits_lead_in(&merits.content));
    doc.push_str("\n\n");

    let _ = writeln!(
        doc,
        "V. CONCLUSION\nBased on the evidence presented, the client satisfies the requirements for {visa} classification."
    );
    doc
}

/// Case-insensitive prefix test on the trimmed content.
fn starts_with_title(content: &str, title: &str) -> bool {
    let title = title.trim();
    if title.is_empty() {
        return false;
    }
    content
        .trim_start()
        .to_lowercase()
        .starts_with(&title.to_lowercase())
}

/// Drop a "Final Merits Determination" lead-in the model wrote itself: up to
/// the first colon when it falls within the first 100 bytes, otherwise the
/// first line when that line mentions "final merits".
fn strip_merits_lead_in(content: &str) -> &str {
    if !starts_with_title(content, MERITS_LEAD_IN) {
        return content;
    }
    if let Some(idx) = content.find(':').filter(|&i| i > 0 && i < 100) {
        return content[idx + 1..].trim();
    }
    if let Some((first, rest)) = content.split_once('\n') {
        if first.to_lowercase().contains("final merits") {
            return rest.trim();
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use meritdraft_core::{Criterion, MERITS_STEP, VisaType};
    use uuid::Uuid;

    fn petition() -> Petition {
        let mut p = Petition::new(Uuid::new_v4());
        p.client_name = "Dr. Ada Park".into();
        p.field_of_expertise = "Machine Learning".into();
        p.selected_criteria = vec![Criterion::Awards, Criterion::Judging];
        p
    }

    fn section(title: &str, content: &str) -> DraftSection {
        DraftSection {
            title: title.into(),
            content: content.into(),
            citations: vec![],
        }
    }

    fn merits(content: &str) -> DraftSection {
        section(MERITS_STEP, content)
    }

    #[test]
    fn fixed_sections_in_order() {
        let doc = assemble(
            &petition(),
            &[
                section("Criterion 1: Awards", "Awards body."),
                section("Criterion 4: Judging", "Judging body."),
            ],
            &merits("Merits body."),
        );
        let order = [
            "PETITION FOR O-1A VISA",
            "I. INTRODUCTION\nDr. Ada Park, in the field of Machine Learning",
            "II. QUALIFICATIONS SUMMARY\nThe client has satisfied the following criteria: Awards, Judging",
            "III. REGULATORY CRITERIA",
            "Criterion 1: Awards\nAwards body.",
            "Criterion 4: Judging\nJudging body.",
            "IV. FINAL MERITS DETERMINATION\nMerits body.",
            "V. CONCLUSION",
        ];
        let mut from = 0;
        for needle in order {
            let at = doc[from..].find(needle).unwrap_or_else(|| panic!("{needle} missing"));
            from += at + needle.len();
        }
        assert!(doc.ends_with("requirements for O-1A classification.\n"));
    }

    #[test]
    fn heading_follows_visa_type() {
        let mut p = petition();
        p.visa_type = VisaType::Eb1A;
        let doc = assemble(&p, &[], &merits("m"));
        assert!(doc.starts_with("PETITION FOR EB-1A VISA"));
        assert!(doc.contains("requirements for EB-1A classification."));
    }

    #[test]
    fn title_already_present_is_not_repeated() {
        let title = "Criterion 1: Awards";
        let doc = assemble(
            &petition(),
            &[section(title, "CRITERION 1: AWARDS\n\nThe beneficiary received...")],
            &merits("m"),
        );
        assert_eq!(doc.to_lowercase().matches(&title.to_lowercase()).count(), 1);
    }

    #[test]
    fn merits_lead_in_up_to_colon() {
        assert_eq!(
            strip_merits_lead_in("Final Merits Determination: The totality of evidence..."),
            "The totality of evidence..."
        );
    }

    #[test]
    fn merits_lead_in_first_line() {
        let long = format!(
            "FINAL MERITS DETERMINATION {}\nBody text: continues",
            "x".repeat(120)
        );
        assert_eq!(strip_merits_lead_in(&long), "Body text: continues");
    }

    #[test]
    fn merits_without_lead_in_untouched() {
        let body = "The beneficiary has shown: sustained acclaim.";
        assert_eq!(strip_merits_lead_in(body), body);
    }
}
