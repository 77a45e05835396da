//! Northbound HTTP server and agent startup

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use ngsi_client::{BoundClient, Dialect, DialectSource, NgsiClient, SharedDialect};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};

/// State shared by the northbound handlers
#[derive(Clone)]
pub struct AppState {
    pub dialect: SharedDialect,
    pub config: Arc<AgentConfig>,
    /// Port the server actually listens on
    pub port: u16,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AboutResponse {
    pub version: String,
    pub port: u16,
    pub base_root: String,
    pub ngsi_version: Dialect,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_url: Option<String>,
}

/// Create the northbound router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/iot/about", get(about))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn about(State(state): State<AppState>) -> Json<AboutResponse> {
    Json(AboutResponse {
        version: state.config.iota_version.clone().unwrap_or_default(),
        port: state.port,
        base_root: "/".to_string(),
        ngsi_version: state.dialect.dialect(),
        provider_url: state.config.provider_url.clone(),
    })
}

/// A running agent; stops the server when dropped
pub struct AgentHandle {
    addr: SocketAddr,
    client: BoundClient,
    dialect: SharedDialect,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl AgentHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Context broker client for the device translation layer
    pub fn client(&self) -> &BoundClient {
        &self.client
    }

    /// Process-wide dialect flag; changes apply to the next broker call
    pub fn dialect(&self) -> &SharedDialect {
        &self.dialect
    }

    /// Stop the server gracefully
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        tracing::info!("Agent stopped");
    }
}

impl Drop for AgentHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Build the broker client and start the northbound server
pub async fn start_server(config: AgentConfig) -> AgentResult<AgentHandle> {
    let cb = &config.context_broker;
    let dialect = SharedDialect::new(cb.ngsi_version);
    let client = NgsiClient::new(dialect.clone())?.create_client(
        cb.host.clone(),
        cb.port,
        config.service.clone(),
        config.subservice.clone(),
    );
    tracing::info!(
        host = %cb.host,
        port = cb.port,
        ngsi_version = %cb.ngsi_version,
        service = %config.service,
        subservice = %config.subservice,
        "Context broker client ready"
    );
    if let Some(provider_url) = &config.provider_url {
        tracing::info!(%provider_url, "Registering as context provider");
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| AgentError::Bind {
            addr: addr.clone(),
            source,
        })?;
    let local_addr = listener
        .local_addr()
        .map_err(|source| AgentError::Bind { addr, source })?;

    let state = AppState {
        dialect: dialect.clone(),
        config: Arc::new(config),
        port: local_addr.port(),
    };
    let app = create_router(state);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
        {
            tracing::error!("Northbound server failed: {}", e);
        }
    });

    tracing::info!("Listening on http://{}", local_addr);

    Ok(AgentHandle {
        addr: local_addr,
        client,
        dialect,
        shutdown_tx: Some(shutdown_tx),
        handle: Some(handle),
    })
}
