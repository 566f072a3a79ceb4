//! Recon Core Library
//!
//! Reconciliation engine for pairing records across two ledgers:
//! - Record sources (CSV, JSON) and term-based extraction
//! - Deterministic rule evaluation (all term pairs must agree)
//! - Heuristic confidence scoring with a human-readable rationale
//! - Greedy one-to-one assignment between left and right records
//! - Remote reconciliation providers (HTTP agent, scripted mock)
//! - Provider payload decoding and response parsing
//! - Orchestration with local fallback when the provider fails

pub mod config;
pub mod decode;
pub mod error;
pub mod evaluate;
pub mod local;
pub mod matcher;
pub mod models;
pub mod orchestrator;
pub mod parsing;
pub mod provider;
pub mod report;
pub mod scoring;
pub mod source;
pub mod terms;

/// Test utilities including mock reconciliation agent server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{MatchingConfig, ProviderConfig, ProviderKind, ReconConfig};
pub use error::{Error, Result};
pub use local::LocalMatcher;
pub use models::{
    ExtractionRule, FieldValue, MatchMethod, MatchMode, MatchingRule, ProfileContext,
    ReconcileRequest, ReconciliationReport, ReconciliationResult, ReconciliationSummary, Record,
    TermPair,
};
pub use orchestrator::Reconciler;
pub use parsing::RemoteReconciliation;
pub use provider::{AgentBackend, MockBackend, MockResponse, ProviderClient, RemoteMatcher};
pub use scoring::{ConfidenceScorer, PairScore, Signal};
pub use source::{extract_records, load_records, RuleSet};
pub use terms::aggregate_terms;
