//! Local matching pipeline: evaluator/scorer, greedy matcher, report builder

use tracing::debug;

use crate::config::MatchingConfig;
use crate::matcher::{match_deterministic, match_heuristic};
use crate::models::{MatchMethod, MatchMode, ReconcileRequest, ReconciliationReport};
use crate::report::build_report;

/// Runs reconciliation entirely in-process. Pure function of its inputs.
#[derive(Debug, Clone, Default)]
pub struct LocalMatcher {
    matching: MatchingConfig,
}

impl LocalMatcher {
    pub fn new(matching: MatchingConfig) -> Self {
        Self { matching }
    }

    pub fn matching(&self) -> &MatchingConfig {
        &self.matching
    }

    pub fn reconcile(&self, request: &ReconcileRequest, mode: MatchMode) -> ReconciliationReport {
        debug!(
            mode = mode.as_str(),
            left = request.left.len(),
            right = request.right.len(),
            rules = request.matching_rules.len(),
            "Running local matcher"
        );

        let (assignment, method) = match mode {
            MatchMode::Deterministic => (
                match_deterministic(
                    &request.left,
                    &request.right,
                    &request.matching_rules,
                    &self.matching,
                ),
                MatchMethod::Deterministic,
            ),
            MatchMode::Heuristic => (
                match_heuristic(
                    &request.left,
                    &request.right,
                    &request.matching_rules,
                    &self.matching,
                ),
                MatchMethod::Heuristic {
                    fallback_reason: None,
                },
            ),
        };

        build_report(assignment, &request.right, mode, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use serde_json::json;

    fn recs(value: serde_json::Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_custom_amount_field() {
        let matching = MatchingConfig {
            amount_field: "Total".to_string(),
            ..MatchingConfig::default()
        };
        let request = ReconcileRequest::new(
            recs(json!([{"Total": "1,200.00"}])),
            recs(json!([{"Total": 1200}])),
        );

        let report = LocalMatcher::new(matching).reconcile(&request, MatchMode::Deterministic);
        assert_eq!(report.method, MatchMethod::Deterministic);
        assert_eq!(report.summary.reconciled_count, 1);
        assert_eq!(report.results[0].matched_fields, vec!["Total".to_string()]);
    }

    #[test]
    fn test_empty_inputs() {
        let request = ReconcileRequest::new(vec![], vec![]);
        let report = LocalMatcher::default().reconcile(&request, MatchMode::Heuristic);
        assert!(report.results.is_empty());
        assert_eq!(report.summary.total, 0);
    }

    #[test]
    fn test_inputs_untouched() {
        let request = ReconcileRequest::new(
            recs(json!([{"Amount": 3, "Date": "2024-01-01"}])),
            recs(json!([{"Amount": 3, "Date": "2024-01-01"}])),
        );
        let before = request.left.clone();
        let _ = LocalMatcher::default().reconcile(&request, MatchMode::Heuristic);
        assert_eq!(request.left, before);
    }
}
