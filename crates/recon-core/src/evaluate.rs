//! Field and rule evaluation
//!
//! Value normalization shared by both matching modes, plus the deterministic
//! all-or-nothing rule gate. The heuristic counterpart lives in `scoring`.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::config::MatchingConfig;
use crate::models::{FieldValue, MatchingRule, Record};

/// Absolute tolerance for two amounts to count as equal
pub const AMOUNT_EPSILON: f64 = 0.01;

/// Date formats accepted for proximity checks, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y", "%d.%m.%Y"];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

/// Trimmed, lower-cased string form of a value
pub fn normalize(value: &FieldValue) -> Option<String> {
    value.as_text().map(|s| s.trim().to_lowercase())
}

/// Token-level Jaccard similarity.
///
/// Strings are split on whitespace and tokens of two characters or fewer are
/// dropped. Two empty token sets are identical (1.0); exactly one empty set
/// shares nothing (0.0).
pub fn token_similarity(a: &str, b: &str) -> f64 {
    let tokens_a: HashSet<&str> = a.split_whitespace().filter(|w| w.chars().count() > 2).collect();
    let tokens_b: HashSet<&str> = b.split_whitespace().filter(|w| w.chars().count() > 2).collect();

    match (tokens_a.is_empty(), tokens_b.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        _ => {}
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    intersection as f64 / union as f64
}

/// Calendar date of a value, if it reads as one
pub fn parse_date(value: &FieldValue) -> Option<NaiveDate> {
    let text = match value {
        FieldValue::Text(s) => s.trim(),
        _ => return None,
    };
    if text.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive())
}

/// Whole calendar days between two dates
pub fn days_apart(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

/// Amounts of a field on both records, when both parse
pub fn amounts(left: &Record, right: &Record, field: &str) -> Option<(f64, f64)> {
    let l = left.get(field)?.as_number()?;
    let r = right.get(field)?.as_number()?;
    Some((l, r))
}

/// Deterministic evaluation of a candidate pair.
///
/// With rules: every term pair of every rule must be present on both sides and
/// equal after normalization; the first failure rejects the candidate. With no
/// rules: the implicit rule compares the amount field within `AMOUNT_EPSILON`.
///
/// Returns the matched field labels, or `None` when the pair is not a match.
/// A rule set that contains no term pairs at all can never match.
pub fn evaluate_rules(
    left: &Record,
    right: &Record,
    rules: &[MatchingRule],
    matching: &MatchingConfig,
) -> Option<Vec<String>> {
    let mut matched = Vec::new();

    if rules.is_empty() {
        let (l, r) = amounts(left, right, &matching.amount_field)?;
        if (l - r).abs() < AMOUNT_EPSILON {
            matched.push(matching.amount_field.clone());
        }
    } else {
        for pair in rules.iter().flat_map(|rule| rule.term_pairs.iter()) {
            // Blank cells (including extraction's placeholders) are never evidence
            let l = left.present(&pair.term1).and_then(normalize)?;
            let r = right.present(&pair.term2).and_then(normalize)?;
            if l != r {
                return None;
            }
            matched.push(pair.label());
        }
    }

    (!matched.is_empty()).then_some(matched)
}
