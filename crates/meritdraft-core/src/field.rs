//! Field-of-expertise sanitisation for embedding queries.
//!
//! Applicants describe their field in free text ("I am a researcher in
//! computational biology", "Area of Artificial Intelligence and Machine
//! Learning"). Retrieval queries only want the canonical field name, so the
//! text is reduced before it is embedded. The sanitised form is never used
//! in the drafted document itself.
//!
//! # Algorithm
//!
//! 1. Trim surrounding whitespace
//! 2. Strip leading filler phrases (case-insensitive, whole words only),
//!    repeating until none match
//! 3. Keep at most [`MAX_FIELD_TOKENS`] whitespace-delimited tokens
//! 4. Re-join with single spaces

/// Maximum number of tokens kept. Five words keeps compound names such as
/// "Artificial Intelligence and Machine Learning" intact.
pub const MAX_FIELD_TOKENS: usize = 5;

/// Leading phrases that carry no field information. Longer phrases come first
/// so that "I am an" wins over "I am a".
const FILLER_PREFIXES: &[&str] = &[
    "I specialize in",
    "I specialise in",
    "My field is",
    "I work in",
    "Expertise in",
    "I am an",
    "I am a",
    "Field of",
    "Area of",
];

/// Reduce a free-text field of expertise to a short canonical field name.
///
/// Idempotent: `sanitize_field(&sanitize_field(s)) == sanitize_field(s)`.
pub fn sanitize_field(field: &str) -> String {
    let mut rest = field.trim();

    while let Some(stripped) = strip_filler(rest) {
        rest = stripped;
    }

    rest.split_whitespace()
        .take(MAX_FIELD_TOKENS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Strip one filler prefix, if present, returning the trimmed remainder.
fn strip_filler(s: &str) -> Option<&str> {
    FILLER_PREFIXES.iter().find_map(|prefix| {
        let head = s.get(..prefix.len())?;
        if !head.eq_ignore_ascii_case(prefix) {
            return None;
        }
        let tail = &s[prefix.len()..];
        // Whole-word match only: "Area of" must not eat "Area ofthings".
        match tail.chars().next() {
            None => Some(tail),
            Some(c) if c.is_whitespace() => Some(tail.trim_start()),
            Some(_) => None,
        }
    })
}
