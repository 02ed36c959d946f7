//! Static per-criterion legal text: section titles, regulatory citations and
//! the canonical regulation paragraph used when retrieval finds nothing.

use std::collections::BTreeMap;

use meritdraft_core::Criterion;

const GENERIC_REGULATION: &str = "Evidence that the alien meets the regulatory criteria for \
extraordinary ability (8 C.F.R. § 214.2(o)(3)(iii)).";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub title: String,
    pub citation: String,
    pub regulation: String,
}

impl CatalogEntry {
    fn new(title: &str, citation: &str, regulation: &str) -> Self {
        Self {
            title: title.to_string(),
            citation: citation.to_string(),
            regulation: regulation.to_string(),
        }
    }
}

/// Immutable criterion lookup tables, injected into the section generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CriterionCatalog {
    entries: BTreeMap<Criterion, CatalogEntry>,
}

impl Default for CriterionCatalog {
    fn default() -> Self {
        Self::o1a()
    }
}

impl CriterionCatalog {
    /// An empty catalog; every lookup falls back to generic text.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The ten O-1A criteria of 8 C.F.R. § 214.2(o)(3)(iii)(A)-(J).
    pub fn o1a() -> Self {
        use Criterion::*;
        let entries = [
            (
                Awards,
                CatalogEntry::new(
                    "Criterion 1: Receipt of Nationally or Internationally Recognized Prizes or Awards",
                    "(8 C.F.R. § 214.2(o)(3)(iii)(A))",
                    "Documentation of the alien's receipt of lesser nationally or internationally \
                     recognized prizes or awards for excellence in the field of endeavor \
                     (8 C.F.R. § 214.2(o)(3)(iii)(A)).",
                ),
            ),
            (
                Membership,
                CatalogEntry::new(
                    "Criterion 2: Membership in Associations",
                    "(8 C.F.R. § 214.2(o)(3)(iii)(B))",
                    "Documentation of the alien's membership in associations in the field for \
                     which classification is sought, which require outstanding achievements of \
                     their members, as judged by recognized national or international experts in \
                     their disciplines or fields (8 C.F.R. § 214.2(o)(3)(iii)(B)).",
                ),
            ),
            (
                MediaCoverage,
                CatalogEntry::new(
                    "Criterion 3: Published Material About the Person",
                    "(8 C.F.R. § 214.2(o)(3)(iii)(C))",
                    "Published material about the alien in professional or major trade \
                     publications or other major media, relating to the alien's work in the \
                     field for which classification is sought. Such evidence shall include the \
                     title, date, and author of the material, and any necessary translation \
                     (8 C.F.R. § 214.2(o)(3)(iii)(C)).",
                ),
            ),
            (
                Judging,
                CatalogEntry::new(
                    "Criterion 4: Participation as a Judge",
                    "(8 C.F.R. § 214.2(o)(3)(iii)(D))",
                    "Evidence of the alien's participation, either individually or on a panel, \
                     as a judge of the work of others in the same or an allied field of \
                     specification for which classification is sought \
                     (8 C.F.R. § 214.2(o)(3)(iii)(D)).",
                ),
            ),
            (
                OriginalContributions,
                CatalogEntry::new(
                    "Criterion 5: Original Scientific Contributions",
                    "(8 C.F.R. § 214.2(o)(3)(iii)(E))",
                    "Evidence of the alien's original scientific, scholarly, artistic, athletic, \
                     or business-related contributions of major significance in the field \
                     (8 C.F.R. § 214.2(o)(3)(iii)(E)).",
                ),
            ),
            (
                Authorship,
                CatalogEntry::new(
                    "Criterion 6: Scholarly Articles",
                    "(8 C.F.R. § 214.2(o)(3)(iii)(F))",
                    "Evidence of the alien's authorship of scholarly articles in the field, in \
                     professional or major trade publications or other major media \
                     (8 C.F.R. § 214.2(o)(3)(iii)(F)).",
                ),
            ),
            (
                Exhibitions,
                CatalogEntry::new(
                    "Criterion 7: Display of Work",
                    "(8 C.F.R. § 214.2(o)(3)(iii)(G))",
                    "Evidence of the display of the alien's work in the field at artistic \
                     exhibitions or showcases (8 C.F.R. § 214.2(o)(3)(iii)(G)).",
                ),
            ),
            (
                CriticalRole,
                CatalogEntry::new(
                    "Criterion 8: Critical or Essential Capacity",
                    "(8 C.F.R. § 214.2(o)(3)(iii)(H))",
                    "Evidence that the alien has performed in a leading or critical role for \
                     organizations or establishments that have a distinguished reputation \
                     (8 C.F.R. § 214.2(o)(3)(iii)(H)).",
                ),
            ),
            (
                HighSalary,
                CatalogEntry::new(
                    "Criterion 9: High Salary",
                    "(8 C.F.R. § 214.2(o)(3)(iii)(I))",
                    "Evidence that the alien has commanded a high salary or other significantly \
                     high remuneration for services, in relation to others in the field \
                     (8 C.F.R. § 214.2(o)(3)(iii)(I)).",
                ),
            ),
            (
                CommercialSuccess,
                CatalogEntry::new(
                    "Criterion 10: Commercial Success",
                    "(8 C.F.R. § 214.2(o)(3)(iii)(J))",
                    "Evidence of commercial successes in the performing arts, as shown by box \
                     office receipts or record, cassette, compact disk, or video sales \
                     (8 C.F.R. § 214.2(o)(3)(iii)(J)).",
                ),
            ),
        ];
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn with_entry(mut self, criterion: Criterion, entry: CatalogEntry) -> Self {
        self.entries.insert(criterion, entry);
        self
    }

    /// Section heading; the criterion label when the catalog has no entry.
    pub fn title(&self, criterion: Criterion) -> &str {
        self.entries
            .get(&criterion)
            .map(|e| e.title.as_str())
            .unwrap_or_else(|| criterion.label())
    }

    /// Regulatory citation, or an empty string.
    pub fn citation(&self, criterion: Criterion) -> &str {
        self.entries
            .get(&criterion)
            .map(|e| e.citation.as_str())
            .unwrap_or("")
    }

    /// Canonical regulation paragraph for prompts without retrieved text.
    pub fn regulation(&self, criterion: Criterion) -> &str {
        self.entries
            .get(&criterion)
            .map(|e| e.regulation.as_str())
            .unwrap_or(GENERIC_REGULATION)
    }
}
