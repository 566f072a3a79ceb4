//! Test utilities for recon-core
//!
//! This module provides a mock reconciliation agent server that speaks the
//! agent HTTP protocol (`POST /invocations`, `GET /ping`) with a scripted reply.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// What the mock agent answers to every invocation
#[derive(Debug, Clone)]
pub struct AgentReply {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl AgentReply {
    /// 200 with the given body
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    /// Arbitrary status with the given body
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    /// Wait before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

struct ServerState {
    reply: AgentReply,
    received: Mutex<Vec<Value>>,
}

/// Mock reconciliation agent for integration tests
pub struct MockAgentServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockAgentServer {
    /// Start the mock server on an available port
    pub async fn start(reply: AgentReply) -> Self {
        let state = Arc::new(ServerState {
            reply,
            received: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/ping", get(handle_ping))
            .route("/invocations", post(handle_invocation))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Invocation bodies received so far
    pub fn received(&self) -> Vec<Value> {
        self.state.received.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockAgentServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_ping(State(state): State<Arc<ServerState>>) -> Json<Value> {
    if !state.reply.delay.is_zero() {
        tokio::time::sleep(state.reply.delay).await;
    }
    Json(json!({"status": "Healthy"}))
}

async fn handle_invocation(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    state.received.lock().unwrap().push(body);

    let reply = &state.reply;
    if !reply.delay.is_zero() {
        tokio::time::sleep(reply.delay).await;
    }
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, reply.body.clone())
}

/// Wrap text as a streamed agent response split into byte chunks
pub fn streamed_body(text: &str, chunk_size: usize) -> String {
    let chunks: Vec<Value> = text
        .as_bytes()
        .chunks(chunk_size.max(1))
        .map(|bytes| json!({"bytes": bytes}))
        .collect();
    json!({ "response": chunks }).to_string()
}
