//! Remote reconciliation providers
//!
//! A provider receives both record sets, the matching rules and the opaque
//! profile context, and answers with a result list or an error. The
//! orchestrator treats every error the same way: fall back to local matching.
//!
//! # Architecture
//!
//! - `RemoteMatcher` trait: the provider capability
//! - `ProviderClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `AgentBackend` (HTTP), `MockBackend` (scripted)
//!
//! # Configuration
//!
//! Selected by `[provider] kind` in the config file (`agent`, `mock`, `none`),
//! or by `RECON_PROVIDER` / `RECON_AGENT_HOST` in the environment.

mod agent;
mod mock;

pub use agent::AgentBackend;
pub use mock::{MockBackend, MockResponse};

use async_trait::async_trait;

use crate::config::{ProviderConfig, ProviderKind};
use crate::error::Result;
use crate::models::ReconcileRequest;
use crate::parsing::RemoteReconciliation;

/// Interface for all remote reconciliation providers
#[async_trait]
pub trait RemoteMatcher: Send + Sync {
    /// Reconcile both record sets. Any error means "use the local matcher".
    async fn reconcile(&self, request: &ReconcileRequest) -> Result<RemoteReconciliation>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> bool;

    /// Provider name (for logging and report metadata)
    fn name(&self) -> &str;

    /// Host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete provider client enum
#[derive(Clone)]
pub enum ProviderClient {
    /// Reconciliation agent over HTTP
    Agent(AgentBackend),
    /// Scripted backend for testing
    Mock(MockBackend),
}

impl ProviderClient {
    /// Build the configured provider. `Ok(None)` when no provider is configured.
    pub fn from_config(config: &ProviderConfig) -> Result<Option<Self>> {
        match config.kind {
            ProviderKind::None => Ok(None),
            ProviderKind::Agent => AgentBackend::from_config(config).map(|b| Some(Self::Agent(b))),
            ProviderKind::Mock => Ok(Some(Self::Mock(MockBackend::new()))),
        }
    }

    /// Create an agent backend directly
    pub fn agent(host: &str) -> Self {
        ProviderClient::Agent(AgentBackend::new(host))
    }

    /// Create a mock backend that answers with the given responses in order
    pub fn mock(responses: Vec<MockResponse>) -> Self {
        ProviderClient::Mock(MockBackend::scripted(responses))
    }
}

// Delegate to the inner backend
#[async_trait]
impl RemoteMatcher for ProviderClient {
    async fn reconcile(&self, request: &ReconcileRequest) -> Result<RemoteReconciliation> {
        match self {
            ProviderClient::Agent(b) => b.reconcile(request).await,
            ProviderClient::Mock(b) => b.reconcile(request).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            ProviderClient::Agent(b) => b.health_check().await,
            ProviderClient::Mock(b) => b.health_check().await,
        }
    }

    fn name(&self) -> &str {
        match self {
            ProviderClient::Agent(b) => b.name(),
            ProviderClient::Mock(b) => b.name(),
        }
    }

    fn host(&self) -> &str {
        match self {
            ProviderClient::Agent(b) => b.host(),
            ProviderClient::Mock(b) => b.host(),
        }
    }
}
