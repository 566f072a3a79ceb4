//! Report assembly and summary statistics

use crate::matcher::Assignment;
use crate::models::{
    MatchMethod, MatchMode, Record, ReconciliationReport, ReconciliationResult,
    ReconciliationSummary,
};

pub const UNMATCHED_RIGHT_REASONING: &str =
    "Unmatched transaction from right document - no corresponding entry found in left document";

pub const UNMATCHED_RIGHT_DISCREPANCY: &str = "No corresponding transaction in left document";

/// Append every right record the matcher left unconsumed as a standalone
/// unreconciled entry, then summarize.
pub fn build_report(
    assignment: Assignment,
    right: &[Record],
    mode: MatchMode,
    method: MatchMethod,
) -> ReconciliationReport {
    let leftovers: Vec<ReconciliationResult> = assignment
        .unconsumed(right)
        .map(|record| unmatched_right(record.clone(), mode))
        .collect();

    let mut results = assignment.results;
    results.extend(leftovers);

    let summary = summarize(&results);
    ReconciliationReport {
        results,
        summary,
        method,
    }
}

fn unmatched_right(record: Record, mode: MatchMode) -> ReconciliationResult {
    let result = ReconciliationResult::unmatched_right(record);
    match mode {
        MatchMode::Deterministic => result,
        MatchMode::Heuristic => ReconciliationResult {
            confidence: Some(0.0),
            discrepancies: vec![UNMATCHED_RIGHT_DISCREPANCY.to_string()],
            ai_reasoning: Some(UNMATCHED_RIGHT_REASONING.to_string()),
            ..result
        },
    }
}

/// Totals over a result list. The confidence score is the mean over all
/// results with an absent confidence counted as 0; an empty list scores 0.
pub fn summarize(results: &[ReconciliationResult]) -> ReconciliationSummary {
    let total = results.len();
    let reconciled_count = results.iter().filter(|r| r.is_reconciled).count();
    let confidence_score = if total == 0 {
        0.0
    } else {
        results.iter().filter_map(|r| r.confidence).sum::<f64>() / total as f64
    };

    ReconciliationSummary {
        total,
        reconciled_count,
        unreconciled_count: total - reconciled_count,
        confidence_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MatchingConfig;
    use crate::matcher::{match_deterministic, match_heuristic};
    use serde_json::json;

    fn recs(value: serde_json::Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary, ReconciliationSummary::default());
    }

    #[test]
    fn test_deterministic_report_appends_leftovers() {
        let left = recs(json!([{"Amount": 1}, {"Amount": 2}]));
        let right = recs(json!([{"Amount": 3}, {"Amount": 1}, {"Amount": 4}]));
        let assignment = match_deterministic(&left, &right, &[], &MatchingConfig::default());
        let report = build_report(
            assignment,
            &right,
            MatchMode::Deterministic,
            MatchMethod::Deterministic,
        );

        assert_eq!(report.results.len(), 4);
        assert!(report.results[0].is_reconciled);
        assert!(!report.results[1].is_reconciled);
        assert!(report.results[2].left_transaction.is_none());
        assert_eq!(
            report.results[2].right_transaction.as_ref().unwrap().get("Amount"),
            Some(&3.0.into())
        );
        assert!(report.results[3].confidence.is_none());

        assert_eq!(report.summary.total, 4);
        assert_eq!(report.summary.reconciled_count, 1);
        assert_eq!(report.summary.unreconciled_count, 3);
        assert_eq!(report.summary.confidence_score, 0.0);
    }

    #[test]
    fn test_heuristic_report_leftovers_carry_reasoning() {
        let left = recs(json!([]));
        let right = recs(json!([{"Amount": 3}]));
        let assignment = match_heuristic(&left, &right, &[], &MatchingConfig::default());
        let report = build_report(
            assignment,
            &right,
            MatchMode::Heuristic,
            MatchMethod::Heuristic {
                fallback_reason: None,
            },
        );

        let leftover = &report.results[0];
        assert_eq!(leftover.confidence, Some(0.0));
        assert_eq!(leftover.discrepancies, vec![UNMATCHED_RIGHT_DISCREPANCY.to_string()]);
        assert_eq!(leftover.ai_reasoning.as_deref(), Some(UNMATCHED_RIGHT_REASONING));
    }

    #[test]
    fn test_summary_mean_counts_every_result() {
        let left = recs(json!([
            {"Amount": 7, "Date": "2024-01-01", "ReferenceId": "Z", "Description": "water utility bill"}
        ]));
        let right = recs(json!([
            {"Amount": 7, "Date": "2024-01-01", "ReferenceId": "Z", "Description": "water utility bill"},
            {"Amount": 500}
        ]));
        let assignment = match_heuristic(&left, &right, &[], &MatchingConfig::default());
        let report = build_report(
            assignment,
            &right,
            MatchMode::Heuristic,
            MatchMethod::Heuristic {
                fallback_reason: None,
            },
        );

        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.reconciled_count, 1);
        assert_eq!(report.summary.confidence_score, 45.0);
    }
}
