//! Parsing of provider output into reconciliation results
//!
//! Model output often wraps the JSON in prose or markdown fences. Two shapes
//! are accepted, tried in order:
//! 1. An object carrying `reconciliationResults` (or `results`) and an
//!    optional `summary`. The first top-level balanced object that parses wins.
//! 2. A bare array of results.

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{ReconciliationResult, ReconciliationSummary};

/// Results as reported by a remote provider, before validation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteReconciliation {
    #[serde(alias = "results")]
    pub reconciliation_results: Vec<ReconciliationResult>,
    /// Provider-computed summary; informational only
    #[serde(default)]
    pub summary: Option<Value>,
}

impl RemoteReconciliation {
    pub fn from_results(results: Vec<ReconciliationResult>) -> Self {
        Self {
            reconciliation_results: results,
            summary: None,
        }
    }

    /// The provider's own summary, if it is well-formed
    pub fn reported_summary(&self) -> Option<ReconciliationSummary> {
        self.summary
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)\s*```").expect("valid regex"))
}

/// Contents of the first markdown code fence, or the trimmed input
pub fn strip_code_fences(text: &str) -> &str {
    match fence_regex().captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str(),
        None => text.trim(),
    }
}

/// Byte ranges of top-level balanced `{...}` spans. Braces inside JSON
/// strings are ignored.
fn top_level_objects(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    spans.push((start, i + 1));
                }
            }
            _ => {}
        }
    }

    spans
}

fn truncate(text: &str) -> String {
    if text.chars().count() > 200 {
        format!("{}...", text.chars().take(200).collect::<String>())
    } else {
        text.to_string()
    }
}

/// Parse provider text into results. No JSON, invalid JSON, or an empty
/// result list is an error.
pub fn parse_reconciliation(text: &str) -> Result<RemoteReconciliation> {
    let body = strip_code_fences(text);

    let parsed = top_level_objects(body)
        .into_iter()
        .find_map(|(s, e)| serde_json::from_str::<RemoteReconciliation>(&body[s..e]).ok())
        .or_else(|| parse_bare_array(body).map(RemoteReconciliation::from_results));

    match parsed {
        Some(reconciliation) if reconciliation.reconciliation_results.is_empty() => Err(
            Error::Provider("Provider returned zero reconciliation results".into()),
        ),
        Some(reconciliation) => Ok(reconciliation),
        None => Err(Error::Provider(format!(
            "No reconciliation JSON found in provider response | Raw: {}",
            truncate(body)
        ))),
    }
}

fn parse_bare_array(text: &str) -> Option<Vec<ReconciliationResult>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if start >= end {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}
