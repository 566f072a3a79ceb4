//! Mock provider for testing
//!
//! Answers with scripted responses, one per call, in order. Once the script
//! runs out every call fails, which sends the orchestrator down the local
//! fallback path.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::decode::decode_payload;
use crate::error::{Error, Result};
use crate::models::ReconcileRequest;
use crate::parsing::{parse_reconciliation, RemoteReconciliation};

use super::RemoteMatcher;

/// One scripted reply
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Raw response body, decoded and parsed like an agent reply
    Body(String),
    /// Fail with a provider error
    Error(String),
    /// Sleep, then answer with the inner response
    Delay(Duration, Box<MockResponse>),
}

impl MockResponse {
    pub fn body(text: impl Into<String>) -> Self {
        MockResponse::Body(text.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        MockResponse::Error(message.into())
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        MockResponse::Delay(delay, Box::new(inner))
    }
}

/// Scripted provider backend
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    script: Arc<Mutex<VecDeque<MockResponse>>>,
    calls: Arc<Mutex<usize>>,
}

impl MockBackend {
    /// Create a new mock backend (healthy, empty script)
    pub fn new() -> Self {
        Self {
            healthy: true,
            ..Self::default()
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self::default()
    }

    pub fn scripted(responses: Vec<MockResponse>) -> Self {
        Self {
            healthy: true,
            script: Arc::new(Mutex::new(responses.into())),
            calls: Arc::default(),
        }
    }

    /// Number of reconcile calls received
    pub fn calls(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or(0)
    }

    fn next_response(&self) -> Option<MockResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
        self.script.lock().ok().and_then(|mut s| s.pop_front())
    }
}

#[async_trait]
impl RemoteMatcher for MockBackend {
    async fn reconcile(&self, _request: &ReconcileRequest) -> Result<RemoteReconciliation> {
        let mut response = self
            .next_response()
            .ok_or_else(|| Error::Provider("Mock provider has no scripted response".into()))?;

        loop {
            match response {
                MockResponse::Body(body) => return parse_reconciliation(&decode_payload(&body)),
                MockResponse::Error(message) => return Err(Error::Provider(message)),
                MockResponse::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    response = *inner;
                }
            }
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_RESULT: &str = r#"{"reconciliationResults": [
        {"leftTransaction": {"Amount": 1}, "rightTransaction": {"Amount": 1}, "isReconciled": true}
    ]}"#;

    #[tokio::test]
    async fn test_script_order_then_exhausted() {
        let mock = MockBackend::scripted(vec![
            MockResponse::body(ONE_RESULT),
            MockResponse::error("boom"),
        ]);
        let request = ReconcileRequest::default();

        assert!(mock.reconcile(&request).await.is_ok());
        assert!(matches!(
            mock.reconcile(&request).await,
            Err(Error::Provider(m)) if m == "boom"
        ));
        assert!(mock.reconcile(&request).await.is_err());
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_delayed_response() {
        let mock = MockBackend::scripted(vec![MockResponse::delayed(
            Duration::from_millis(10),
            MockResponse::body(ONE_RESULT),
        )]);
        let parsed = mock.reconcile(&ReconcileRequest::default()).await.unwrap();
        assert_eq!(parsed.reconciliation_results.len(), 1);
    }

    #[tokio::test]
    async fn test_unhealthy() {
        assert!(!MockBackend::unhealthy().health_check().await);
        assert!(MockBackend::new().health_check().await);
    }
}
