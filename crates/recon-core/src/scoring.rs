//! Heuristic confidence scoring
//!
//! A candidate pair earns additive credit from independent signals:
//!
//! | Signal                   | Condition                       | Weight |
//! |--------------------------|---------------------------------|--------|
//! | Rule field exact         | normalized term1 == term2       | +25    |
//! | Rule field similar       | token similarity > 0.8          | +15    |
//! | Amount exact             | abs diff < 0.01                 | +30    |
//! | Amount close             | abs diff / max < 1%             | +20    |
//! | Date same day            | 0 days apart                    | +20    |
//! | Date next day            | 1 day apart                     | +15    |
//! | Date within 3 days       | 2-3 days apart                  | +10    |
//! | Description very similar | token similarity > 0.9          | +15    |
//! | Description similar      | token similarity > 0.7          | +10    |
//! | Reference exact          | equal                           | +25    |
//!
//! The sum is clipped to 100.

use crate::config::MatchingConfig;
use crate::evaluate::{amounts, days_apart, normalize, parse_date, token_similarity, AMOUNT_EPSILON};
use crate::models::{MatchingRule, Record};

/// Confidence at or above which a pair is reconciled and its right record consumed
pub const RECONCILE_THRESHOLD: f64 = 80.0;

/// Confidence at or above which the best candidate is reported for review
pub const CANDIDATE_THRESHOLD: f64 = 50.0;

pub const MAX_CONFIDENCE: f64 = 100.0;

/// One contributing piece of evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    RuleExact,
    RuleSimilar,
    AmountExact,
    AmountClose,
    DateSameDay,
    DateNextDay,
    DateWithinThreeDays,
    DescriptionVerySimilar,
    DescriptionSimilar,
    ReferenceExact,
}

impl Signal {
    pub fn weight(&self) -> f64 {
        match self {
            Self::RuleExact => 25.0,
            Self::RuleSimilar => 15.0,
            Self::AmountExact => 30.0,
            Self::AmountClose => 20.0,
            Self::DateSameDay => 20.0,
            Self::DateNextDay => 15.0,
            Self::DateWithinThreeDays => 10.0,
            Self::DescriptionVerySimilar => 15.0,
            Self::DescriptionSimilar => 10.0,
            Self::ReferenceExact => 25.0,
        }
    }
}

/// Score of one candidate pair
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairScore {
    /// 0-100
    pub confidence: f64,
    pub signals: Vec<Signal>,
    pub matched_fields: Vec<String>,
    pub discrepancies: Vec<String>,
}

impl PairScore {
    fn credit(&mut self, signal: Signal, label: String) {
        self.confidence = (self.confidence + signal.weight()).min(MAX_CONFIDENCE);
        self.signals.push(signal);
        self.matched_fields.push(label);
    }

    fn note(&mut self, discrepancy: String) {
        self.discrepancies.push(discrepancy);
    }

    /// Human-readable rationale for this score
    pub fn reasoning(&self) -> String {
        reasoning(self.confidence, &self.matched_fields, &self.discrepancies)
    }
}

/// Scores candidate pairs against a fixed rule set
pub struct ConfidenceScorer<'a> {
    rules: &'a [MatchingRule],
    matching: &'a MatchingConfig,
}

impl<'a> ConfidenceScorer<'a> {
    pub fn new(rules: &'a [MatchingRule], matching: &'a MatchingConfig) -> Self {
        Self { rules, matching }
    }

    pub fn score(&self, left: &Record, right: &Record) -> PairScore {
        let mut score = PairScore::default();
        self.score_rules(left, right, &mut score);
        self.score_amount(left, right, &mut score);
        self.score_date(left, right, &mut score);
        self.score_description(left, right, &mut score);
        self.score_reference(left, right, &mut score);
        score
    }

    fn score_rules(&self, left: &Record, right: &Record, score: &mut PairScore) {
        for pair in self.rules.iter().flat_map(|rule| rule.term_pairs.iter()) {
            let (Some(l), Some(r)) = (left.present(&pair.term1), right.present(&pair.term2))
            else {
                continue;
            };
            let (Some(l_norm), Some(r_norm)) = (normalize(l), normalize(r)) else {
                continue;
            };

            if l_norm == r_norm {
                score.credit(Signal::RuleExact, format!("{} (Exact)", pair.label()));
            } else if token_similarity(&l_norm, &r_norm) > 0.8 {
                score.credit(Signal::RuleSimilar, format!("{} (Similar)", pair.label()));
                score.note(format!("{}: \"{}\" vs \"{}\"", pair.term1, l, r));
            }
        }
    }

    fn score_amount(&self, left: &Record, right: &Record, score: &mut PairScore) {
        let field = &self.matching.amount_field;
        let Some((l, r)) = amounts(left, right, field) else {
            return;
        };

        let difference = (l - r).abs();
        let scale = l.abs().max(r.abs());
        if difference < AMOUNT_EPSILON {
            score.credit(Signal::AmountExact, format!("{} (Exact)", field));
        } else if scale > 0.0 && difference / scale < 0.01 {
            score.credit(Signal::AmountClose, format!("{} (Close)", field));
            score.note(format!("{} difference: {:.2}", field, difference));
        }
    }

    fn score_date(&self, left: &Record, right: &Record, score: &mut PairScore) {
        let field = &self.matching.date_field;
        let (Some(l), Some(r)) = (
            left.get(field).and_then(parse_date),
            right.get(field).and_then(parse_date),
        ) else {
            return;
        };

        match days_apart(l, r) {
            0 => score.credit(Signal::DateSameDay, format!("{} (Same Day)", field)),
            1 => score.credit(Signal::DateNextDay, format!("{} (Next Day)", field)),
            days @ 2..=3 => {
                score.credit(
                    Signal::DateWithinThreeDays,
                    format!("{} (Within 3 Days)", field),
                );
                score.note(format!("{} difference: {} days", field, days));
            }
            _ => {}
        }
    }

    fn score_description(&self, left: &Record, right: &Record, score: &mut PairScore) {
        let field = &self.matching.description_field;
        let (Some(l), Some(r)) = (
            left.present(field).and_then(normalize),
            right.present(field).and_then(normalize),
        ) else {
            return;
        };

        let similarity = token_similarity(&l, &r);
        if similarity > 0.9 {
            score.credit(
                Signal::DescriptionVerySimilar,
                format!("{} (Very Similar)", field),
            );
        } else if similarity > 0.7 {
            score.credit(Signal::DescriptionSimilar, format!("{} (Similar)", field));
        }
    }

    fn score_reference(&self, left: &Record, right: &Record, score: &mut PairScore) {
        let field = &self.matching.reference_field;
        if let (Some(l), Some(r)) = (left.present(field), right.present(field)) {
            if l == r {
                score.credit(Signal::ReferenceExact, format!("{} (Exact)", field));
            }
        }
    }
}

/// Rationale text for a confidence band, annotated with the contributing
/// fields and any recorded discrepancies
pub fn reasoning(confidence: f64, matched_fields: &[String], discrepancies: &[String]) -> String {
    let fields = if matched_fields.is_empty() {
        "no matching fields".to_string()
    } else {
        matched_fields.join(", ")
    };
    let noted = discrepancies.join(", ");

    if confidence >= 95.0 {
        format!(
            "Excellent match ({:.1}%) with strong alignment across {}. {}",
            confidence,
            fields,
            if discrepancies.is_empty() {
                "Perfect field alignment.".to_string()
            } else {
                format!("Minor discrepancies within acceptable tolerance: {}.", noted)
            }
        )
    } else if confidence >= 85.0 {
        format!(
            "High confidence match ({:.1}%) based on {}. {}",
            confidence,
            fields,
            if discrepancies.is_empty() {
                "Strong field correlation detected.".to_string()
            } else {
                format!("Note: {}.", noted)
            }
        )
    } else if confidence >= 70.0 {
        let detail = if discrepancies.is_empty() {
            String::new()
        } else {
            format!("Discrepancies: {}. ", noted)
        };
        format!(
            "Good match ({:.1}%) with correlation in {}. {}Recommended for review.",
            confidence, fields, detail
        )
    } else if confidence >= 50.0 {
        format!(
            "Moderate match ({:.1}%) based on {}. Requires manual review due to {}.",
            confidence,
            fields,
            if discrepancies.is_empty() {
                "insufficient matching criteria"
            } else {
                noted.as_str()
            }
        )
    } else {
        format!(
            "Low confidence ({:.1}%) based on {}. Significant differences detected. Manual intervention recommended.",
            confidence, fields
        )
    }
}
