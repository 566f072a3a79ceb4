//! Reconcile command implementation

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use recon_core::{
    extract_records, load_records, MatchMode, ReconConfig, ReconcileRequest, Reconciler,
    ReconciliationReport, ReconciliationResult, Record, RuleSet,
};
use tracing::{debug, info};

use super::truncate;

/// How the CLI chooses a matching path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Provider when configured (local heuristic fallback); otherwise
    /// deterministic when rules are given, heuristic when not
    Auto,
    /// Skip the provider
    Local(MatchMode),
}

impl RunMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(RunMode::Auto),
            other => match other.parse::<MatchMode>() {
                Ok(mode) => Ok(RunMode::Local(mode)),
                Err(_) => bail!(
                    "Unknown mode: {} (expected auto, heuristic, or deterministic)",
                    s
                ),
            },
        }
    }
}

/// Load both sources and rules, then reconcile
pub async fn run_reconcile(
    sources: &[PathBuf],
    rules: Option<&Path>,
    mode: RunMode,
    config: Option<&Path>,
) -> Result<ReconciliationReport> {
    let config = ReconConfig::load(config).context("Failed to load config")?;
    let rule_set = match rules {
        Some(path) => RuleSet::load(path)
            .with_context(|| format!("Failed to load rules from {}", path.display()))?,
        None => RuleSet::default(),
    };

    let mut sets = Vec::with_capacity(sources.len());
    for path in sources {
        let records =
            load_records(path).with_context(|| format!("Failed to load {}", path.display()))?;
        sets.push(records);
    }

    let mut request = ReconcileRequest::from_sources(sets)?
        .with_rules(rule_set.matching_rules)
        .with_extraction_rules(rule_set.extraction_rules)
        .with_context(rule_set.profile);

    if !request.extraction_rules.is_empty() {
        request.left = extract_records(&request.left, &request.extraction_rules)
            .context("Failed to extract left records")?;
        request.right = extract_records(&request.right, &request.extraction_rules)
            .context("Failed to extract right records")?;
        debug!(
            left = request.left.len(),
            right = request.right.len(),
            "Applied extraction rules"
        );
    }

    let reconciler = Reconciler::new(&config)?;
    let report = match mode {
        RunMode::Local(mode) => reconciler.reconcile_local(&request, mode),
        RunMode::Auto if reconciler.provider().is_none() && !request.matching_rules.is_empty() => {
            reconciler.reconcile_local(&request, MatchMode::Deterministic)
        }
        RunMode::Auto => reconciler.reconcile(&request).await,
    };

    info!(method = %report.method, total = report.summary.total, "Reconciliation finished");
    Ok(report)
}

pub async fn cmd_reconcile(
    sources: &[PathBuf],
    rules: Option<&Path>,
    mode: &str,
    config: Option<&Path>,
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    let mode = RunMode::parse(mode)?;
    let report = run_reconcile(sources, rules, mode, config).await?;

    if let Some(path) = output {
        let content = serde_json::to_string_pretty(&report)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
        if let Some(path) = output {
            println!("   Report written to {}", path.display());
        }
    }

    Ok(())
}

fn print_report(report: &ReconciliationReport) {
    println!();
    println!("🔗 Reconciliation ({})", report.method);
    println!("   ─────────────────────────────────────────────────────────────");

    if report.results.is_empty() {
        println!("   No records on either side.");
    }

    for result in &report.results {
        println!("   {}", describe_result(result));
        if let Some(ref reasoning) = result.ai_reasoning {
            if result.left_transaction.is_some() {
                println!("        {}", truncate(reasoning, 90));
            }
        }
    }

    let summary = &report.summary;
    println!();
    println!("📊 Summary");
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Total:          {}", summary.total);
    println!("   Reconciled:     {}", summary.reconciled_count);
    println!("   Unreconciled:   {}", summary.unreconciled_count);
    println!("   Confidence:     {:.1}%", summary.confidence_score);
    println!();
}

pub fn describe_result(result: &ReconciliationResult) -> String {
    let icon = match (&result.left_transaction, &result.right_transaction) {
        _ if result.is_reconciled => "✅",
        (Some(_), Some(_)) => "🔍",
        (Some(_), None) => "❌",
        (None, _) => "➕",
    };
    let confidence = result
        .confidence
        .map(|c| format!(" {:>5.1}%", c))
        .unwrap_or_default();
    let side = |record: &Option<Record>| {
        record
            .as_ref()
            .map(|r| truncate(&describe_record(r), 36))
            .unwrap_or_else(|| "-".to_string())
    };

    format!(
        "{}{} {:<36} │ {}",
        icon,
        confidence,
        side(&result.left_transaction),
        side(&result.right_transaction)
    )
}

/// Compact `field=value` listing of a record
pub fn describe_record(record: &Record) -> String {
    record
        .fields()
        .filter(|(_, v)| v.is_present())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(" ")
}
