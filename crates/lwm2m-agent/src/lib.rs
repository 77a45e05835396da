//! lwm2m-agent - LWM2M IoT agent bootstrap
//!
//! Loads the agent configuration, builds the NGSI context broker client and
//! starts the northbound HTTP server with the client available to it. The
//! LWM2M device layer drives the client through [`AgentHandle::client`].

pub mod config;
pub mod error;
pub mod server;

pub use config::{log_filter_for, AgentConfig, ContextBrokerConfig, ServerConfig};
pub use error::{AgentError, AgentResult};
pub use server::{create_router, start_server, AgentHandle, AppState};
