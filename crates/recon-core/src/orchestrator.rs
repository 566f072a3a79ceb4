//! Primary/fallback orchestration
//!
//! Each call first asks the configured remote provider, bounded by a timeout.
//! If the provider errors, times out, returns nothing usable, or returns
//! results that do not fit the request, the same inputs go through the local
//! heuristic matcher instead. Fallback is logged, never returned as an error;
//! `ReconciliationReport::method` records which path produced the results.
//! Nothing is shared between calls: every request decides independently.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::{MatchingConfig, ReconConfig};
use crate::error::{Error, Result};
use crate::local::LocalMatcher;
use crate::models::{
    FieldValue, MatchMethod, MatchMode, ReconcileRequest, ReconciliationReport, ReconciliationResult, Record,
};
use crate::parsing::RemoteReconciliation;
use crate::provider::{ProviderClient, RemoteMatcher};
use crate::report::summarize;

pub const NO_PROVIDER_REASON: &str = "no provider configured";

/// Selects between the remote provider and the local matcher
#[derive(Clone)]
pub struct Reconciler {
    provider: Option<ProviderClient>,
    local: LocalMatcher,
    timeout: Duration,
}

impl Reconciler {
    /// Build from config, including the configured provider (if any)
    pub fn new(config: &ReconConfig) -> Result<Self> {
        let provider = ProviderClient::from_config(&config.provider)?;
        Ok(Self {
            provider,
            local: LocalMatcher::new(config.matching.clone()),
            timeout: config.provider.timeout,
        })
    }

    /// Local matching only
    pub fn local_only(matching: MatchingConfig) -> Self {
        Self {
            provider: None,
            local: LocalMatcher::new(matching),
            timeout: ReconConfig::default().provider.timeout,
        }
    }

    pub fn with_provider(mut self, provider: ProviderClient) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider(&self) -> Option<&ProviderClient> {
        self.provider.as_ref()
    }

    /// Reconcile via the provider, falling back to the local heuristic
    /// matcher on any provider failure.
    pub async fn reconcile(&self, request: &ReconcileRequest) -> ReconciliationReport {
        let Some(provider) = self.provider.as_ref() else {
            debug!("No provider configured, using local heuristic matcher");
            return self.fallback(request, NO_PROVIDER_REASON.to_string());
        };

        info!(
            provider = provider.name(),
            host = provider.host(),
            left = request.left.len(),
            right = request.right.len(),
            rules = request.matching_rules.len(),
            "Calling reconciliation provider"
        );

        match self.try_remote(provider, request).await {
            Ok(report) => {
                info!(
                    provider = provider.name(),
                    total = report.summary.total,
                    reconciled = report.summary.reconciled_count,
                    "Provider reconciliation complete"
                );
                report
            }
            Err(e) => {
                warn!(
                    provider = provider.name(),
                    reason = %e,
                    "Provider failed, falling back to local heuristic matching"
                );
                self.fallback(request, e.to_string())
            }
        }
    }

    /// Run the local pipeline directly, with no provider involvement
    pub fn reconcile_local(&self, request: &ReconcileRequest, mode: MatchMode) -> ReconciliationReport {
        let report = self.local.reconcile(request, mode);
        info!(
            mode = mode.as_str(),
            total = report.summary.total,
            reconciled = report.summary.reconciled_count,
            "Local reconciliation complete"
        );
        report
    }

    fn fallback(&self, request: &ReconcileRequest, reason: String) -> ReconciliationReport {
        let mut report = self.reconcile_local(request, MatchMode::Heuristic);
        report.method = MatchMethod::Heuristic {
            fallback_reason: Some(reason),
        };
        report
    }

    async fn try_remote(
        &self,
        provider: &ProviderClient,
        request: &ReconcileRequest,
    ) -> Result<ReconciliationReport> {
        let remote = tokio::time::timeout(self.timeout, provider.reconcile(request))
            .await
            .map_err(|_| {
                Error::Provider(format!(
                    "Provider timed out after {}s",
                    self.timeout.as_secs_f64()
                ))
            })??;

        accept_remote(request, remote, provider.name())
    }
}

/// Validate provider results against the request, clamp confidences and
/// recompute the summary locally.
fn accept_remote(
    request: &ReconcileRequest,
    remote: RemoteReconciliation,
    provider: &str,
) -> Result<ReconciliationReport> {
    if let Some(reported) = remote.reported_summary() {
        debug!(
            total = reported.total,
            reconciled = reported.reconciled_count,
            "Provider-reported summary (recomputed locally)"
        );
    }

    let mut results = remote.reconciliation_results;

    let with_left = results
        .iter()
        .filter(|r| r.left_transaction.is_some())
        .count();
    if with_left != request.left.len() {
        return Err(Error::Provider(format!(
            "Provider returned {} results with a left transaction for {} left records",
            with_left,
            request.left.len()
        )));
    }

    if results
        .iter()
        .any(|r| r.is_reconciled && r.right_transaction.is_none())
    {
        return Err(Error::Provider(
            "Provider marked a result reconciled without a right transaction".into(),
        ));
    }

    // Every left record exactly once, every reconciled right record at most
    // once; accepted results carry the caller's records, not the agent's copies
    let mut left_used = vec![false; request.left.len()];
    let mut right_used = vec![false; request.right.len()];
    for result in results.iter_mut() {
        if let Some(left) = result.left_transaction.as_ref() {
            let index = claim(&request.left, &mut left_used, left).ok_or_else(|| {
                Error::Provider("Provider returned a left transaction not in the request".into())
            })?;
            result.left_transaction = Some(request.left[index].clone());
        }
        if result.is_reconciled {
            if let Some(right) = result.right_transaction.as_ref() {
                let index = claim(&request.right, &mut right_used, right).ok_or_else(|| {
                    Error::Provider(
                        "Provider reconciled a right transaction that is unknown or already matched"
                            .into(),
                    )
                })?;
                result.right_transaction = Some(request.right[index].clone());
            }
        }
        clamp_confidence(result);
    }

    let summary = summarize(&results);
    Ok(ReconciliationReport {
        results,
        summary,
        method: MatchMethod::Remote {
            provider: provider.to_string(),
        },
    })
}

/// Mark and return the first unused record in `pool` equal to `record`
fn claim(pool: &[Record], used: &mut [bool], record: &Record) -> Option<usize> {
    let index = pool
        .iter()
        .enumerate()
        .position(|(i, candidate)| !used[i] && same_record(candidate, record))?;
    used[index] = true;
    Some(index)
}

/// Field-wise comparison on text form, so the agent's `10` equals a CSV `"10"`
fn same_record(a: &Record, b: &Record) -> bool {
    let text = |v: &FieldValue| v.as_text().map(|t| t.trim().to_string());
    a.len() == b.len()
        && a
            .fields()
            .zip(b.fields())
            .all(|((ka, va), (kb, vb))| ka == kb && text(va) == text(vb))
}

fn clamp_confidence(result: &mut ReconciliationResult) {
    result.confidence = result
        .confidence
        .map(|c| if c.is_finite() { c.clamp(0.0, 100.0) } else { 0.0 });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockResponse;
    use serde_json::json;

    fn recs(value: serde_json::Value) -> Vec<Record> {
        serde_json::from_value(value).unwrap()
    }

    fn row() -> serde_json::Value {
        json!({"Amount": 10, "Date": "2024-01-01", "ReferenceId": "A", "Description": "paper towels case"})
    }

    fn request() -> ReconcileRequest {
        ReconcileRequest::new(recs(json!([row()])), recs(json!([row()])))
    }

    fn is_remote(report: &ReconciliationReport) -> bool {
        matches!(report.method, MatchMethod::Remote { .. })
    }

    fn reconciler(responses: Vec<MockResponse>) -> Reconciler {
        Reconciler::local_only(MatchingConfig::default()).with_provider(ProviderClient::mock(responses))
    }

    #[tokio::test]
    async fn test_no_provider_uses_heuristic() {
        let report = Reconciler::local_only(MatchingConfig::default())
            .reconcile(&request())
            .await;
        assert_eq!(
            report.method,
            MatchMethod::Heuristic {
                fallback_reason: Some(NO_PROVIDER_REASON.into())
            }
        );
        assert_eq!(report.summary.reconciled_count, 1);
    }

    #[tokio::test]
    async fn test_remote_success() {
        let body = json!({
            "reconciliationResults": [{
                "leftTransaction": row(),
                "rightTransaction": row(),
                "isReconciled": true,
                "matchedFields": ["Amount"],
                "confidence": 140
            }],
            "summary": {"totalTransactions": 9, "reconciledCount": 9, "unreconciledCount": 0, "confidenceScore": 140}
        })
        .to_string();

        let report = reconciler(vec![MockResponse::body(body)])
            .reconcile(&request())
            .await;

        assert_eq!(
            report.method,
            MatchMethod::Remote {
                provider: "mock".into()
            }
        );
        assert_eq!(report.results[0].confidence, Some(100.0));
        assert_eq!(report.summary.total, 1);
        assert_eq!(report.summary.confidence_score, 100.0);
    }

    #[tokio::test]
    async fn test_provider_error_falls_back() {
        let report = reconciler(vec![MockResponse::error("connection refused")])
            .reconcile(&request())
            .await;

        match &report.method {
            MatchMethod::Heuristic {
                fallback_reason: Some(reason),
            } => assert!(reason.contains("connection refused")),
            other => panic!("unexpected method {:?}", other),
        }
        assert_eq!(report.results.len(), 1);
        assert!(report.results[0].is_reconciled);
    }

    #[tokio::test]
    async fn test_unparseable_and_empty_fall_back() {
        for body in ["I'm sorry, I can't do that.", r#"{"reconciliationResults": []}"#, ""] {
            let report = reconciler(vec![MockResponse::body(body)])
                .reconcile(&request())
                .await;
            assert!(matches!(
                report.method,
                MatchMethod::Heuristic {
                    fallback_reason: Some(_)
                }
            ));
        }
    }

    #[tokio::test]
    async fn test_shape_mismatch_falls_back() {
        // Two left-bearing results for one left record
        let body = json!({"results": [
            {"leftTransaction": {"Amount": 10}, "rightTransaction": null, "isReconciled": false},
            {"leftTransaction": {"Amount": 11}, "rightTransaction": null, "isReconciled": false}
        ]})
        .to_string();
        let report = reconciler(vec![MockResponse::body(body)])
            .reconcile(&request())
            .await;
        assert!(matches!(report.method, MatchMethod::Heuristic { .. }));

        // Reconciled without a right side
        let body = json!({"results": [
            {"leftTransaction": {"Amount": 10}, "rightTransaction": "-", "isReconciled": true}
        ]})
        .to_string();
        let report = reconciler(vec![MockResponse::body(body)])
            .reconcile(&request())
            .await;
        assert!(matches!(report.method, MatchMethod::Heuristic { .. }));
    }

    #[tokio::test]
    async fn test_right_record_reconciled_twice_falls_back() {
        let request = ReconcileRequest::new(
            recs(json!([{"Amount": 10, "n": 1}, {"Amount": 10, "n": 2}])),
            recs(json!([{"Amount": 10}])),
        );
        let body = json!({"results": [
            {"leftTransaction": {"Amount": 10, "n": 1}, "rightTransaction": {"Amount": 10}, "isReconciled": true},
            {"leftTransaction": {"Amount": 10, "n": 2}, "rightTransaction": {"Amount": 10}, "isReconciled": true}
        ]})
        .to_string();

        let report = reconciler(vec![MockResponse::body(body)])
            .reconcile(&request)
            .await;

        assert!(!is_remote(&report));
        let reconciled: Vec<_> = report.results.iter().filter(|r| r.is_reconciled).collect();
        assert!(reconciled.len() <= 1);
    }

    #[tokio::test]
    async fn test_unknown_right_record_falls_back() {
        let body = json!({"results": [
            {"leftTransaction": row(), "rightTransaction": {"Amount": 10, "Ghost": true}, "isReconciled": true}
        ]})
        .to_string();
        let report = reconciler(vec![MockResponse::body(body)])
            .reconcile(&request())
            .await;
        assert!(!is_remote(&report));
    }

    #[tokio::test]
    async fn test_invented_left_record_falls_back() {
        let request = ReconcileRequest::new(recs(json!([{"Amount": 10}])), vec![]);
        let body = json!({"results": [
            {"leftTransaction": {"Amount": 999, "Invented": "yes"}, "rightTransaction": null, "isReconciled": false}
        ]})
        .to_string();

        let report = reconciler(vec![MockResponse::body(body)])
            .reconcile(&request)
            .await;

        assert!(!is_remote(&report));
        assert_eq!(report.results[0].left_transaction.as_ref(), Some(&request.left[0]));
    }

    #[tokio::test]
    async fn test_remote_results_carry_request_records() {
        // CSV-style text cells; the agent echoes them back as numbers
        let request = ReconcileRequest::new(
            recs(json!([{"Amount": "10", "Id": "007"}, {"Amount": "20", "Id": "008"}])),
            recs(json!([{"Amount": "20"}])),
        );
        let body = json!({"results": [
            {"leftTransaction": {"Amount": 20, "Id": "008"}, "rightTransaction": {"Amount": 20}, "isReconciled": true},
            {"leftTransaction": {"Amount": 10, "Id": "007"}, "rightTransaction": null, "isReconciled": false}
        ]})
        .to_string();

        let report = reconciler(vec![MockResponse::body(body)])
            .reconcile(&request)
            .await;

        assert!(is_remote(&report));
        assert_eq!(report.results[0].left_transaction.as_ref(), Some(&request.left[1]));
        assert_eq!(report.results[0].right_transaction.as_ref(), Some(&request.right[0]));
        assert_eq!(report.results[1].left_transaction.as_ref(), Some(&request.left[0]));
    }

    #[test]
    fn test_same_record_compares_text_form() {
        let a: Record = [("Amount", FieldValue::Number(10.0))].into_iter().collect();
        let b: Record = [("Amount", " 10 ")].into_iter().collect();
        let c: Record = [("Amount", "10"), ("Extra", "x")].into_iter().collect();
        assert!(same_record(&a, &b));
        assert!(!same_record(&a, &c));
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let slow = MockResponse::delayed(
            Duration::from_secs(5),
            MockResponse::error("never reached"),
        );
        let report = reconciler(vec![slow])
            .with_timeout(Duration::from_millis(20))
            .reconcile(&request())
            .await;

        match report.method {
            MatchMethod::Heuristic {
                fallback_reason: Some(reason),
            } => assert!(reason.contains("timed out")),
            other => panic!("unexpected method {:?}", other),
        }
        assert_eq!(report.summary.reconciled_count, 1);
    }

    #[test]
    fn test_reconcile_local_deterministic() {
        let report = Reconciler::local_only(MatchingConfig::default())
            .reconcile_local(&request(), MatchMode::Deterministic);
        assert_eq!(report.method, MatchMethod::Deterministic);
        assert!(report.results[0].confidence.is_none());
    }
}
