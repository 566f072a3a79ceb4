//! Data models for reconciliation
//!
//! Field names on the wire follow the camelCase shape the reconciliation agent
//! speaks (`leftTransaction`, `isReconciled`, `termPairs`, ...), so the same types
//! serve for CLI JSON output and for decoding agent responses.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

// ========== Records ==========

/// A scalar cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// String coercion used for rule comparison. Null has no text form.
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Null => None,
            FieldValue::Bool(b) => Some(b.to_string()),
            FieldValue::Number(n) => Some(format_number(*n)),
            FieldValue::Text(s) => Some(s.clone()),
        }
    }

    /// Numeric coercion. Text is trimmed and thousands separators are dropped.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => s.trim().replace(',', "").parse::<f64>().ok()?,
            FieldValue::Null | FieldValue::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Null and blank text carry no signal
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Text(s) => !s.trim().is_empty(),
            _ => true,
        }
    }
}

/// Integral numbers render without a fractional part ("100", not "100.0"),
/// so a numeric cell compares equal to the same value read from text.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => f.write_str(&text),
            None => f.write_str("null"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

/// One row of a record source: field name to scalar value.
///
/// Keys are kept sorted so serialized output is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, FieldValue>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Value of a field if it is present and not blank
    pub fn present(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field).filter(|v| v.is_present())
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Record(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// ========== Rules ==========

/// Declares that `term1` on the left schema is compared against `term2` on the right
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPair {
    pub term1: String,
    pub term2: String,
}

impl TermPair {
    pub fn new(term1: impl Into<String>, term2: impl Into<String>) -> Self {
        Self {
            term1: term1.into(),
            term2: term2.into(),
        }
    }

    /// Label used in `matchedFields` ("Invoice↔Reference")
    pub fn label(&self) -> String {
        format!("{}↔{}", self.term1, self.term2)
    }
}

/// A named set of term pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "termPairs", alias = "term_pairs", alias = "rules", default)]
    pub term_pairs: Vec<TermPair>,
}

impl MatchingRule {
    pub fn new(name: impl Into<String>, term_pairs: Vec<TermPair>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            term_pairs,
        }
    }
}

/// Declares which columns a record source is expected to expose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub terms: Vec<String>,
}

impl ExtractionRule {
    pub fn new(name: impl Into<String>, terms: &[&str]) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            terms: terms.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Opaque profile context forwarded to the remote provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileContext {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

// ========== Requests ==========

/// Everything one reconciliation call needs. Inputs are never mutated.
#[derive(Debug, Clone, Default)]
pub struct ReconcileRequest {
    pub left: Vec<Record>,
    pub right: Vec<Record>,
    pub matching_rules: Vec<MatchingRule>,
    pub extraction_rules: Vec<ExtractionRule>,
    pub context: ProfileContext,
}

impl ReconcileRequest {
    pub fn new(left: Vec<Record>, right: Vec<Record>) -> Self {
        Self {
            left,
            right,
            ..Default::default()
        }
    }

    /// Build a request from a list of record sets, which must hold exactly two
    pub fn from_sources(sources: Vec<Vec<Record>>) -> Result<Self> {
        let count = sources.len();
        let mut iter = sources.into_iter();
        match (iter.next(), iter.next(), iter.next()) {
            (Some(left), Some(right), None) => Ok(Self::new(left, right)),
            _ => Err(Error::InvalidRequest(format!(
                "Exactly two record sets are required, got {}",
                count
            ))),
        }
    }

    pub fn with_rules(mut self, rules: Vec<MatchingRule>) -> Self {
        self.matching_rules = rules;
        self
    }

    pub fn with_extraction_rules(mut self, rules: Vec<ExtractionRule>) -> Self {
        self.extraction_rules = rules;
        self
    }

    pub fn with_context(mut self, context: ProfileContext) -> Self {
        self.context = context;
        self
    }
}

// ========== Results ==========

/// Local matching mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// All-or-nothing rule evaluation
    Deterministic,
    /// Weighted 0-100 confidence scoring
    Heuristic,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::Heuristic => "heuristic",
        }
    }
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "deterministic" | "rules" => Ok(Self::Deterministic),
            "heuristic" | "fuzzy" => Ok(Self::Heuristic),
            _ => Err(format!(
                "Unknown match mode: {} (expected deterministic or heuristic)",
                s
            )),
        }
    }
}

/// Outcome for one left record, or one unconsumed right record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    /// `None` for a right record no left record claimed
    #[serde(default, deserialize_with = "lenient_record")]
    pub left_transaction: Option<Record>,
    #[serde(default, deserialize_with = "lenient_record")]
    pub right_transaction: Option<Record>,
    #[serde(default)]
    pub is_reconciled: bool,
    #[serde(default)]
    pub matched_fields: Vec<String>,
    /// 0-100, present in heuristic and remote results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discrepancies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_reasoning: Option<String>,
}

impl ReconciliationResult {
    /// An unreconciled entry for a left record with no candidate
    pub fn unmatched_left(left: Record) -> Self {
        Self {
            left_transaction: Some(left),
            right_transaction: None,
            is_reconciled: false,
            matched_fields: Vec::new(),
            confidence: None,
            discrepancies: Vec::new(),
            ai_reasoning: None,
        }
    }

    /// An unreconciled entry for a right record nothing consumed
    pub fn unmatched_right(right: Record) -> Self {
        Self {
            left_transaction: None,
            right_transaction: Some(right),
            is_reconciled: false,
            matched_fields: Vec::new(),
            confidence: None,
            discrepancies: Vec::new(),
            ai_reasoning: None,
        }
    }
}

/// Agents emit `{}`, `null`, or `"-"` for a missing side; all mean absent.
fn lenient_record<'de, D>(deserializer: D) -> std::result::Result<Option<Record>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Object(map) if !map.is_empty() => {
            serde_json::from_value(serde_json::Value::Object(map))
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
        _ => Ok(None),
    }
}

/// Aggregate statistics over a result list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    #[serde(alias = "totalTransactions")]
    pub total: usize,
    pub reconciled_count: usize,
    pub unreconciled_count: usize,
    /// Mean confidence across all results, absent confidence counted as 0
    pub confidence_score: f64,
}

/// Which path produced a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchMethod {
    Remote {
        provider: String,
    },
    Heuristic {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback_reason: Option<String>,
    },
    Deterministic,
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMethod::Remote { provider } => write!(f, "remote ({})", provider),
            MatchMethod::Heuristic {
                fallback_reason: Some(reason),
            } => write!(f, "heuristic fallback ({})", reason),
            MatchMethod::Heuristic {
                fallback_reason: None,
            } => f.write_str("heuristic"),
            MatchMethod::Deterministic => f.write_str("deterministic"),
        }
    }
}

/// Full outcome of one reconciliation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub results: Vec<ReconciliationResult>,
    pub summary: ReconciliationSummary,
    pub method: MatchMethod,
}
