//! Greedy one-to-one assignment
//!
//! Left records are processed in input order. Each one scans the right records
//! that are still available and claims at most one of them; a claimed right
//! record is never offered to a later left record. The pass is single and
//! non-backtracking, so an earlier left record can take a right record a later
//! one would have scored higher. That approximation is intentional.

use crate::config::MatchingConfig;
use crate::evaluate::evaluate_rules;
use crate::models::{MatchingRule, Record, ReconciliationResult};
use crate::scoring::{ConfidenceScorer, PairScore, CANDIDATE_THRESHOLD, RECONCILE_THRESHOLD};

/// Reasoning attached to a left record with no qualifying candidate
pub const NO_CANDIDATE_REASONING: &str = "No suitable match found in right document";

/// Left-side outcomes of a matching pass
#[derive(Debug, Clone)]
pub struct Assignment {
    /// One result per left record, in left input order
    pub results: Vec<ReconciliationResult>,
    /// `consumed[j]` is set once right record `j` has been reconciled
    pub consumed: Vec<bool>,
}

impl Assignment {
    fn with_capacity(left: usize, right: usize) -> Self {
        Self {
            results: Vec::with_capacity(left),
            consumed: vec![false; right],
        }
    }

    /// Right records no left record reconciled against, in input order
    pub fn unconsumed<'a>(&'a self, right: &'a [Record]) -> impl Iterator<Item = &'a Record> + 'a {
        right
            .iter()
            .zip(self.consumed.iter())
            .filter(|(_, consumed)| !**consumed)
            .map(|(record, _)| record)
    }
}

/// All-or-nothing matching: the first available right record that satisfies
/// every rule is reconciled and consumed.
pub fn match_deterministic(
    left: &[Record],
    right: &[Record],
    rules: &[MatchingRule],
    matching: &MatchingConfig,
) -> Assignment {
    let mut assignment = Assignment::with_capacity(left.len(), right.len());

    for l in left {
        let hit = right.iter().enumerate().find_map(|(j, r)| {
            if assignment.consumed[j] {
                return None;
            }
            evaluate_rules(l, r, rules, matching).map(|fields| (j, fields))
        });

        let result = match hit {
            Some((j, matched_fields)) => {
                assignment.consumed[j] = true;
                ReconciliationResult {
                    left_transaction: Some(l.clone()),
                    right_transaction: Some(right[j].clone()),
                    is_reconciled: true,
                    matched_fields,
                    confidence: None,
                    discrepancies: Vec::new(),
                    ai_reasoning: None,
                }
            }
            None => ReconciliationResult::unmatched_left(l.clone()),
        };
        assignment.results.push(result);
    }

    assignment
}

/// Confidence-scored matching.
///
/// For each left record the highest-scoring available right record at or
/// above `CANDIDATE_THRESHOLD` is kept; ties go to the lowest right index.
/// Candidates at or above `RECONCILE_THRESHOLD` are reconciled and consumed.
/// Weaker candidates are reported for review without being consumed.
pub fn match_heuristic(
    left: &[Record],
    right: &[Record],
    rules: &[MatchingRule],
    matching: &MatchingConfig,
) -> Assignment {
    let scorer = ConfidenceScorer::new(rules, matching);
    let mut assignment = Assignment::with_capacity(left.len(), right.len());

    for l in left {
        let mut best: Option<(usize, PairScore)> = None;

        for (j, r) in right.iter().enumerate() {
            if assignment.consumed[j] {
                continue;
            }
            let score = scorer.score(l, r);
            if score.confidence < CANDIDATE_THRESHOLD {
                continue;
            }
            // Strictly greater keeps the earliest index on ties
            let better = best
                .as_ref()
                .map_or(true, |(_, current)| score.confidence > current.confidence);
            if better {
                best = Some((j, score));
            }
        }

        let result = match best {
            Some((j, score)) => {
                let is_reconciled = score.confidence >= RECONCILE_THRESHOLD;
                if is_reconciled {
                    assignment.consumed[j] = true;
                }
                let ai_reasoning = Some(score.reasoning());
                ReconciliationResult {
                    left_transaction: Some(l.clone()),
                    right_transaction: Some(right[j].clone()),
                    is_reconciled,
                    matched_fields: score.matched_fields,
                    confidence: Some(score.confidence),
                    discrepancies: score.discrepancies,
                    ai_reasoning,
                }
            }
            None => ReconciliationResult {
                confidence: Some(0.0),
                ai_reasoning: Some(NO_CANDIDATE_REASONING.to_string()),
                ..ReconciliationResult::unmatched_left(l.clone())
            },
        };
        assignment.results.push(result);
    }

    assignment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TermPair;
    use serde_json::json;

    fn recs(value: serde_json::Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_deterministic_default_rule() {
        let left = recs(json!([{"Amount": 100, "Date": "2024-01-01"}]));
        let right = recs(json!([{"Amount": 100, "Date": "2024-01-01"}]));
        let a = match_deterministic(&left, &right, &[], &MatchingConfig::default());

        assert_eq!(a.results.len(), 1);
        assert!(a.results[0].is_reconciled);
        assert_eq!(a.results[0].matched_fields, vec!["Amount".to_string()]);
        assert_eq!(a.consumed, vec![true]);
    }

    #[test]
    fn test_deterministic_no_match() {
        let rules = vec![MatchingRule::new("id", vec![TermPair::new("ID", "ID")])];
        let left = recs(json!([{"ID": "A"}]));
        let right = recs(json!([{"ID": "B"}]));
        let a = match_deterministic(&left, &right, &rules, &MatchingConfig::default());

        assert!(!a.results[0].is_reconciled);
        assert!(a.results[0].right_transaction.is_none());
        assert!(a.results[0].matched_fields.is_empty());
        assert_eq!(a.unconsumed(&right).count(), 1);
    }

    #[test]
    fn test_deterministic_consumes_once() {
        let left = recs(json!([{"Amount": 5}, {"Amount": 5}, {"Amount": 5}]));
        let right = recs(json!([{"Amount": 5, "n": 1}, {"Amount": 5, "n": 2}]));
        let a = match_deterministic(&left, &right, &[], &MatchingConfig::default());

        let n = |i: usize| {
            a.results[i]
                .right_transaction
                .as_ref()
                .and_then(|r| r.get("n").cloned())
        };
        assert_eq!(n(0), Some(1.0.into()));
        assert_eq!(n(1), Some(2.0.into()));
        assert!(!a.results[2].is_reconciled);
        assert!(a.consumed.iter().all(|c| *c));
    }

    #[test]
    fn test_heuristic_sub_threshold_not_recorded() {
        let left = recs(json!([{"Amount": 100.00, "Date": "2024-01-01"}]));
        let right = recs(json!([{"Amount": 100.005, "Date": "2024-01-02"}]));
        let a = match_heuristic(&left, &right, &[], &MatchingConfig::default());

        let result = &a.results[0];
        assert!(!result.is_reconciled);
        assert!(result.right_transaction.is_none());
        assert_eq!(result.confidence, Some(0.0));
        assert_eq!(result.ai_reasoning.as_deref(), Some(NO_CANDIDATE_REASONING));
        assert_eq!(a.consumed, vec![false]);
    }

    #[test]
    fn test_heuristic_tie_goes_to_lowest_index() {
        let left = recs(json!([
            {"Amount": 42, "Date": "2024-02-01", "ReferenceId": "X1", "Description": "annual support renewal"}
        ]));
        let right = recs(json!([
            {"Amount": 42, "Date": "2024-02-01", "ReferenceId": "X1", "Description": "annual support renewal", "slot": "first"},
            {"Amount": 42, "Date": "2024-02-01", "ReferenceId": "X1", "Description": "annual support renewal", "slot": "second"}
        ]));

        for _ in 0..3 {
            let a = match_heuristic(&left, &right, &[], &MatchingConfig::default());
            let chosen = a.results[0].right_transaction.as_ref().unwrap();
            assert_eq!(chosen.get("slot"), Some(&"first".into()));
            assert_eq!(a.consumed, vec![true, false]);
        }
    }

    #[test]
    fn test_heuristic_review_band_not_consumed() {
        // Exact amount + same day = 50: reviewable, not reconciled
        let left = recs(json!([
            {"Amount": 10, "Date": "2024-05-01"},
            {"Amount": 10, "Date": "2024-05-01", "ReferenceId": "R", "Description": "desk lamp purchase"}
        ]));
        let right = recs(json!([
            {"Amount": 10, "Date": "2024-05-01", "ReferenceId": "R", "Description": "Desk lamp purchase"}
        ]));
        let a = match_heuristic(&left, &right, &[], &MatchingConfig::default());

        assert!(!a.results[0].is_reconciled);
        assert_eq!(a.results[0].confidence, Some(50.0));
        assert!(a.results[0].right_transaction.is_some());
        assert!(a.results[0]
            .ai_reasoning
            .as_deref()
            .unwrap()
            .starts_with("Moderate match"));

        // Still available to the second left record, which reconciles
        assert!(a.results[1].is_reconciled);
        assert_eq!(a.results[1].confidence, Some(90.0));
        assert_eq!(a.consumed, vec![true]);
    }

    #[test]
    fn test_heuristic_greedy_is_order_dependent() {
        let left = recs(json!([
            {"Amount": 10, "Date": "2024-05-02", "ReferenceId": "B", "Description": "desk lamp purchase"},
            {"Amount": 10, "Date": "2024-05-01", "ReferenceId": "B", "Description": "desk lamp purchase"}
        ]));
        let right = recs(json!([
            {"Amount": 10, "Date": "2024-05-01", "ReferenceId": "B", "Description": "desk lamp purchase"},
            {"Amount": 99, "Date": "2024-09-09"}
        ]));
        let a = match_heuristic(&left, &right, &[], &MatchingConfig::default());

        // The first left record claims right[0] at 85 even though the second
        // would have scored it at 90
        assert!(a.results[0].is_reconciled);
        assert_eq!(a.results[0].confidence, Some(85.0));
        assert!(!a.results[1].is_reconciled);
        assert!(a.results[1].right_transaction.is_none());
        assert_eq!(a.consumed, vec![true, false]);
    }
}
