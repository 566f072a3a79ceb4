//! HTTP reconciliation agent backend
//!
//! Talks to an agent runtime exposing `POST /invocations` and `GET /ping`.
//! The invocation body carries both record sets, the matching rules and the
//! profile context; the reply is decoded by [`crate::decode`] and parsed by
//! [`crate::parsing`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::decode::decode_payload;
use crate::error::{Error, Result};
use crate::models::{MatchingRule, ReconcileRequest, Record};
use crate::parsing::{parse_reconciliation, RemoteReconciliation};

use super::RemoteMatcher;

/// Default bound on the `/ping` health check
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct AgentBackend {
    http_client: Client,
    base_url: String,
    session_id: String,
    api_key: Option<String>,
    health_timeout: Duration,
}

impl AgentBackend {
    /// Create a new agent backend with a generated session id
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_id: generate_session_id(),
            api_key: None,
            health_timeout: HEALTH_CHECK_TIMEOUT,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Create from provider config. The bearer token is read from the
    /// environment variable named by `api_key_env`.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| Error::Config("Agent provider requires a host".into()))?;

        let mut backend = Self::new(host);
        if let Some(ref session_id) = config.session_id {
            backend = backend.with_session_id(session_id.clone());
        }
        if let Ok(key) = std::env::var(&config.api_key_env) {
            if !key.trim().is_empty() {
                backend = backend.with_api_key(key);
            }
        }
        Ok(backend)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

fn generate_session_id() -> String {
    format!(
        "reconciliation-session-{}",
        chrono::Utc::now().timestamp_millis()
    )
}

/// Invocation body sent to the agent
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvocationRequest<'a> {
    operation: &'static str,
    left_document: &'a [Record],
    right_document: &'a [Record],
    matching_rules: &'a [MatchingRule],
    profile_context: ProfileContextBody<'a>,
    session_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileContextBody<'a> {
    profile_name: &'a str,
    profile_description: &'a str,
}

#[async_trait]
impl RemoteMatcher for AgentBackend {
    async fn reconcile(&self, request: &ReconcileRequest) -> Result<RemoteReconciliation> {
        let body = InvocationRequest {
            operation: "reconcile",
            left_document: &request.left,
            right_document: &request.right,
            matching_rules: &request.matching_rules,
            profile_context: ProfileContextBody {
                profile_name: &request.context.name,
                profile_description: &request.context.description,
            },
            session_id: &self.session_id,
        };

        let mut call = self
            .http_client
            .post(format!("{}/invocations", self.base_url))
            .json(&body);
        if let Some(ref key) = self.api_key {
            call = call.bearer_auth(key);
        }

        let response = call.send().await?.error_for_status()?;
        let raw = response.text().await?;
        debug!(bytes = raw.len(), session = %self.session_id, "Agent response received");

        let text = decode_payload(&raw);
        if text.trim().is_empty() {
            return Err(Error::Provider("Agent returned an empty payload".into()));
        }
        parse_reconciliation(&text)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/ping", self.base_url))
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &str {
        "agent"
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
