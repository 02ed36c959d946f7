//! Applicant-supplied criterion details.
//!
//! Clients submit a loosely-typed attribute bag per criterion. It is parsed
//! once, at the boundary, into a [`CriterionDetail`] whose shape depends on
//! the criterion. Numeric facts (citation counts, review counts, salaries)
//! arrive as JSON integers, floats or numeric strings and are held as
//! [`Quantity`], whose `Display` reproduces the supplied value exactly.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use crate::criterion::Criterion;

#[derive(Debug, Error)]
pub enum DetailError {
    #[error("criteria details must be a JSON object: {0}")]
    Malformed(#[source] serde_json::Error),
    #[error("unknown criterion in criteria details: {0:?}")]
    UnknownCriterion(String),
    #[error("invalid details for {criterion}: {source}")]
    Invalid {
        criterion: Criterion,
        #[source]
        source: serde_json::Error,
    },
}

// ── Quantity ──

/// A numeric fact together with the text it is rendered as.
///
/// JSON integers keep every digit, so counts beyond `f64` precision are not
/// rounded. JSON floats with no fractional part drop the `.0` (`89.0`
/// renders as `89`). Numeric strings are kept exactly as supplied, trimmed,
/// so `"02139"` and `"412500.00"` render unchanged. Equality compares the
/// numeric value.
#[derive(Debug, Clone)]
pub struct Quantity {
    value: f64,
    text: String,
}

/// Above this magnitude an `f64` can no longer represent every integer.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

impl Quantity {
    pub fn new(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let text = if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
            (value as i64).to_string()
        } else {
            value.to_string()
        };
        Some(Self { value, text })
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// The rendering used in fact blocks.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    fn parse_str(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }
        let value = s.parse::<f64>().ok().filter(|v| v.is_finite())?;
        Some(Self {
            value,
            text: s.to_string(),
        })
    }

    fn from_i64(v: i64) -> Self {
        Self {
            value: v as f64,
            text: v.to_string(),
        }
    }

    fn from_u64(v: u64) -> Self {
        Self {
            value: v as f64,
            text: v.to_string(),
        }
    }

    fn from_json(n: &serde_json::Number) -> Option<Self> {
        if let Some(v) = n.as_i64() {
            Some(Self::from_i64(v))
        } else if let Some(v) = n.as_u64() {
            Some(Self::from_u64(v))
        } else {
            n.as_f64().and_then(Self::new)
        }
    }
}

impl PartialEq for Quantity {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl From<u32> for Quantity {
    fn from(v: u32) -> Self {
        Self::from_u64(v.into())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for Quantity {
    /// Written back as a JSON number when that number reads as the same
    /// text, otherwise as the original string.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Ok(v) = self.text.parse::<i64>() {
            if v.to_string() == self.text {
                return serializer.serialize_i64(v);
            }
        }
        if let Ok(v) = self.text.parse::<u64>() {
            if v.to_string() == self.text {
                return serializer.serialize_u64(v);
            }
        }
        if self.value.to_string() == self.text {
            return serializer.serialize_f64(self.value);
        }
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct QuantityVisitor;

        impl Visitor<'_> for QuantityVisitor {
            type Value = Quantity;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a number or numeric string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
                Ok(Quantity::from_i64(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
                Ok(Quantity::from_u64(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Quantity, E> {
                Quantity::new(v).ok_or_else(|| E::custom("non-finite number"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Quantity, E> {
                Quantity::parse_str(v)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_any(QuantityVisitor)
    }
}

// ── Free-form values ──

/// A scalar or nested value from a generic attribute bag. Only JSON numbers
/// become [`FactValue::Number`]; strings stay text even when they look
/// numeric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FactValue {
    Null,
    Flag(bool),
    Number(Quantity),
    Text(String),
    List(Vec<FactValue>),
    Map(BTreeMap<String, FactValue>),
}

impl FactValue {
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.iter().all(FactValue::is_blank),
            Self::Map(map) => map.values().all(FactValue::is_blank),
            Self::Flag(_) | Self::Number(_) => false,
        }
    }

    fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Flag(b),
            Value::Number(n) => match Quantity::from_json(&n) {
                Some(q) => Self::Number(q),
                None => Self::Text(n.to_string()),
            },
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }
}

impl<'de> Deserialize<'de> for FactValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_json)
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Flag(b) => f.write_str(if *b { "yes" } else { "no" }),
            Self::Number(q) => write!(f, "{q}"),
            Self::Text(s) => f.write_str(s),
            Self::List(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter(|v| !v.is_blank())
                    .map(|v| v.to_string())
                    .collect();
                f.write_str(&parts.join("; "))
            }
            Self::Map(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .filter(|(_, v)| !v.is_blank())
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect();
                f.write_str(&parts.join(", "))
            }
        }
    }
}

// ── Criterion-specific layouts ──

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Award {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AwardsDetail {
    #[serde(default)]
    pub awards: Vec<Award>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgingDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub venue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub papers_reviewed: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact_factor: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citations: Option<Quantity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorshipDetail {
    #[serde(default)]
    pub publications: Vec<Publication>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContributionsDetail {
    #[serde(default)]
    pub contributions: Vec<Contribution>,
}

/// Fallback layout for criteria without a bespoke shape: a `description`
/// plus any other attributes the client supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impact: Option<String>,
    #[serde(flatten)]
    pub other: BTreeMap<String, FactValue>,
}

/// Parsed details for one criterion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CriterionDetail {
    Awards(AwardsDetail),
    Judging(JudgingDetail),
    Authorship(AuthorshipDetail),
    OriginalContributions(ContributionsDetail),
    Generic(GenericDetail),
}

impl CriterionDetail {
    /// Parse a raw attribute bag using the layout for `criterion`.
    pub fn parse(criterion: Criterion, raw: Value) -> Result<Self, DetailError> {
        let invalid = |source| DetailError::Invalid { criterion, source };
        let detail = match criterion {
            Criterion::Awards => Self::Awards(serde_json::from_value(raw).map_err(invalid)?),
            Criterion::Judging => Self::Judging(serde_json::from_value(raw).map_err(invalid)?),
            Criterion::Authorship => {
                Self::Authorship(serde_json::from_value(raw).map_err(invalid)?)
            }
            Criterion::OriginalContributions => {
                Self::OriginalContributions(serde_json::from_value(raw).map_err(invalid)?)
            }
            _ => Self::Generic(serde_json::from_value(raw).map_err(invalid)?),
        };
        Ok(detail)
    }

    /// True when the client supplied nothing usable for this criterion.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Awards(d) => d.awards.is_empty(),
            Self::Judging(d) => {
                d.venue.is_none()
                    && d.role.is_none()
                    && d.papers_reviewed.is_none()
                    && d.importance.is_none()
                    && d.impact.is_none()
            }
            Self::Authorship(d) => d.publications.is_empty(),
            Self::OriginalContributions(d) => d.contributions.is_empty(),
            Self::Generic(d) => {
                d.description.is_none()
                    && d.importance.is_none()
                    && d.impact.is_none()
                    && d.other.values().all(FactValue::is_blank)
            }
        }
    }
}

/// Criterion details keyed by criterion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CriteriaDetails(BTreeMap<Criterion, CriterionDetail>);

impl CriteriaDetails {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of `criterion id → attribute bag`.
    pub fn from_value(value: Value) -> Result<Self, DetailError> {
        let raw: BTreeMap<String, Value> = match value {
            Value::Null => return Ok(Self::default()),
            other => serde_json::from_value(other).map_err(DetailError::Malformed)?,
        };
        let mut details = BTreeMap::new();
        for (key, bag) in raw {
            let criterion: Criterion = key
                .parse()
                .map_err(|_| DetailError::UnknownCriterion(key.clone()))?;
            details.insert(criterion, CriterionDetail::parse(criterion, bag)?);
        }
        Ok(Self(details))
    }

    pub fn insert(&mut self, criterion: Criterion, detail: CriterionDetail) {
        self.0.insert(criterion, detail);
    }

    pub fn get(&self, criterion: Criterion) -> Option<&CriterionDetail> {
        self.0.get(&criterion)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for CriteriaDetails {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_and_float_citations_are_equal() {
        let a: Quantity = serde_json::from_value(json!(89)).unwrap();
        let b: Quantity = serde_json::from_value(json!(89.0)).unwrap();
        let c: Quantity = serde_json::from_value(json!("89")).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.to_string(), "89");
        assert_eq!(b.to_string(), "89");
    }

    #[test]
    fn fractional_values_not_rounded() {
        let q: Quantity = serde_json::from_value(json!(4.25)).unwrap();
        assert_eq!(q.to_string(), "4.25");
        let q: Quantity = serde_json::from_value(json!(0.1)).unwrap();
        assert_eq!(q.to_string(), "0.1");
    }

    #[test]
    fn large_amounts_verbatim() {
        let q: Quantity = serde_json::from_value(json!(1_250_000)).unwrap();
        assert_eq!(q.to_string(), "1250000");
    }

    #[test]
    fn non_numeric_string_rejected() {
        assert!(serde_json::from_value::<Quantity>(json!("many")).is_err());
    }

    #[test]
    fn numeric_strings_keep_their_text() {
        let q: Quantity = serde_json::from_value(json!("412500.00")).unwrap();
        assert_eq!(q.to_string(), "412500.00");
        assert_eq!(q.value(), 412500.0);
        let q: Quantity = serde_json::from_value(json!(" 02139 ")).unwrap();
        assert_eq!(q.to_string(), "02139");
        assert_eq!(serde_json::to_value(&q).unwrap(), json!("02139"));
    }

    #[test]
    fn integers_beyond_f64_precision_keep_every_digit() {
        let q: Quantity = serde_json::from_value(json!(9_007_199_254_740_993_u64)).unwrap();
        assert_eq!(q.to_string(), "9007199254740993");
        assert_eq!(serde_json::to_string(&q).unwrap(), "9007199254740993");
    }

    #[test]
    fn generic_strings_stay_text() {
        let detail = CriterionDetail::parse(
            Criterion::HighSalary,
            json!({"salary": "412500.00", "postal_code": "02139", "ratio": "1e3", "count": 7}),
        )
        .unwrap();
        let CriterionDetail::Generic(d) = detail else {
            panic!("expected generic layout");
        };
        assert_eq!(d.other["salary"], FactValue::Text("412500.00".into()));
        assert_eq!(d.other["postal_code"].to_string(), "02139");
        assert_eq!(d.other["ratio"].to_string(), "1e3");
        assert_eq!(d.other["count"], FactValue::Number(Quantity::from(7)));
    }

    #[test]
    fn quantity_serialises_integral_as_integer() {
        let q: Quantity = serde_json::from_value(json!(89.0)).unwrap();
        assert_eq!(serde_json::to_string(&q).unwrap(), "89");
    }

    #[test]
    fn parses_authorship_layout() {
        let detail = CriterionDetail::parse(
            Criterion::Authorship,
            json!({
                "publications": [
                    {"title": "Sparse Attention", "journal": "NeurIPS", "citations": 89.0},
                    {"title": "Graph Priors", "citations": 12}
                ]
            }),
        )
        .unwrap();
        let CriterionDetail::Authorship(d) = detail else {
            panic!("expected authorship layout");
        };
        assert_eq!(d.publications.len(), 2);
        assert_eq!(d.publications[0].citations.as_ref().unwrap().to_string(), "89");
        assert_eq!(d.publications[1].journal, None);
    }

    #[test]
    fn unlisted_criteria_use_generic_layout() {
        let detail = CriterionDetail::parse(
            Criterion::HighSalary,
            json!({"description": "Base salary well above median", "salary": 310000, "currency": "USD"}),
        )
        .unwrap();
        let CriterionDetail::Generic(d) = detail else {
            panic!("expected generic layout");
        };
        assert_eq!(d.description.as_deref(), Some("Base salary well above median"));
        assert_eq!(
            d.other.get("salary"),
            Some(&FactValue::Number(Quantity::from(310000)))
        );
        assert_eq!(d.other.get("currency"), Some(&FactValue::Text("USD".into())));
    }

    #[test]
    fn wrongly_typed_field_is_an_error() {
        let err = CriterionDetail::parse(Criterion::Judging, json!({"papers_reviewed": "lots"}))
            .unwrap_err();
        assert!(matches!(
            err,
            DetailError::Invalid {
                criterion: Criterion::Judging,
                ..
            }
        ));
    }

    #[test]
    fn empty_bags_detected() {
        assert!(CriterionDetail::parse(Criterion::Awards, json!({})).unwrap().is_empty());
        assert!(
            CriterionDetail::parse(Criterion::Membership, json!({"notes": ""}))
                .unwrap()
                .is_empty()
        );
        assert!(
            !CriterionDetail::parse(Criterion::Judging, json!({"venue": "ICML"}))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn criteria_details_from_json_object() {
        let details: CriteriaDetails = serde_json::from_value(json!({
            "awards": {"awards": [{"name": "Best Paper Award"}]},
            "judging": {"venue": "ICML", "role": "Area Chair", "papers_reviewed": 40}
        }))
        .unwrap();
        assert_eq!(details.len(), 2);
        assert!(details.get(Criterion::Awards).is_some());
        assert!(details.get(Criterion::Authorship).is_none());
    }

    #[test]
    fn criteria_details_reject_unknown_keys() {
        let err = CriteriaDetails::from_value(json!({"patents": {"description": "x"}})).unwrap_err();
        assert!(matches!(err, DetailError::UnknownCriterion(k) if k == "patents"));
    }

    #[test]
    fn criteria_details_survive_json_roundtrip() {
        let details = CriteriaDetails::from_value(json!({
            "authorship": {"publications": [{"title": "T", "citations": 89}]},
            "high_salary": {"salary": 250000.0}
        }))
        .unwrap();
        let json = serde_json::to_value(&details).unwrap();
        assert_eq!(json["authorship"]["publications"][0]["citations"], json!(89));
        let back: CriteriaDetails = serde_json::from_value(json).unwrap();
        assert_eq!(back, details);
    }
}
