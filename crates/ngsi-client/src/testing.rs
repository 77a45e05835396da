//! Test utilities for ngsi-client
//!
//! Provides an in-process context broker that records every request it
//! receives and answers with a configurable status and body.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::client::{FIWARE_SERVICE, FIWARE_SERVICE_PATH};
use crate::types::{ConnectionParams, Dialect};
use crate::{NgsiClient, Result};

/// One request as seen by the mock broker
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub service: Option<String>,
    pub service_path: Option<String>,
    /// Parsed JSON body, `Null` when empty or not JSON
    pub body: Value,
}

#[derive(Debug, Clone)]
struct Reply {
    status: StatusCode,
    body: Value,
}

#[derive(Clone)]
struct BrokerState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    reply: Arc<Mutex<Reply>>,
}

/// A mock context broker that shuts down when dropped
pub struct MockContextBroker {
    pub addr: SocketAddr,
    state: BrokerState,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl MockContextBroker {
    /// Start a broker that answers `200 {}` to everything
    ///
    /// # Example
    ///
    /// ```ignore
    /// use ngsi_client::testing::MockContextBroker;
    ///
    /// let broker = MockContextBroker::start().await?;
    /// let client = broker.client(Dialect::V2)?
    ///     .bind(broker.connection("smartGondor", "/gardens"));
    /// client.update(&entity, &attributes).await?;
    /// assert_eq!(broker.last_request().unwrap().path, "/v2/op/update");
    /// ```
    pub async fn start() -> Result<Self> {
        Self::start_with_reply(200, json!({})).await
    }

    /// Start a broker with a fixed reply
    pub async fn start_with_reply(status: u16, body: Value) -> Result<Self> {
        let state = BrokerState {
            requests: Arc::new(Mutex::new(Vec::new())),
            reply: Arc::new(Mutex::new(Reply {
                status: reply_status(status),
                body,
            })),
        };

        // Bind to any available port
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let router = Router::new().fallback(record).with_state(state.clone());

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Ok(Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Connection parameters pointing at this broker
    pub fn connection(&self, service: &str, subservice: &str) -> ConnectionParams {
        ConnectionParams::new(self.host(), self.port(), service, subservice)
    }

    /// A client with short timeouts, suitable for talking to this broker
    pub fn client(&self, dialect: Dialect) -> Result<NgsiClient> {
        NgsiClient::with_config(dialect, Duration::from_secs(5), Duration::from_secs(2))
    }

    /// Change what the broker answers from now on
    pub fn set_reply(&self, status: u16, body: Value) {
        *self.state.reply.lock() = Reply {
            status: reply_status(status),
            body,
        };
    }

    /// Every request received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.state.requests.lock().last().cloned()
    }

    /// Shutdown the broker gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for MockContextBroker {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

fn reply_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn record(
    State(state): State<BrokerState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    state.requests.lock().push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        service: header(FIWARE_SERVICE),
        service_path: header(FIWARE_SERVICE_PATH),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let reply = state.reply.lock().clone();
    (reply.status, Json(reply.body)).into_response()
}
