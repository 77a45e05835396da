//! TOML configuration for the LWM2M agent
//!
//! ```toml
//! log_level = "DEBUG"
//! service = "smartGondor"
//! subservice = "/gardens"
//!
//! [context_broker]
//! host = "localhost"
//! port = 1026
//! ngsi_version = "v2"
//!
//! [server]
//! port = 4041
//! ```
//!
//! Values from the file can be overridden through `IOTA_*` environment
//! variables, see [`AgentConfig::apply_overrides`].

use std::path::Path;

use ngsi_client::Dialect;
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, AgentResult};

/// Context broker the agent writes device data to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextBrokerConfig {
    #[serde(default = "default_cb_host")]
    pub host: String,
    #[serde(default = "default_cb_port")]
    pub port: u16,
    /// NGSI dialect used for updates and queries
    #[serde(default)]
    pub ngsi_version: Dialect,
}

impl Default for ContextBrokerConfig {
    fn default() -> Self {
        Self {
            host: default_cb_host(),
            port: default_cb_port(),
            ngsi_version: Dialect::default(),
        }
    }
}

/// Northbound HTTP server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

fn default_log_level() -> String {
    "INFO".to_string()
}

fn default_cb_host() -> String {
    "localhost".to_string()
}

fn default_cb_port() -> u16 {
    1026
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    4041
}

/// Top-level agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// DEBUG, INFO, WARN, ERROR or FATAL
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub context_broker: ContextBrokerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Default tenant (`fiware-service`)
    pub service: String,
    /// Default sub-tenant (`fiware-servicepath`)
    pub subservice: String,
    /// URL the broker should use to reach this agent
    #[serde(default)]
    pub provider_url: Option<String>,
    /// Agent version, stamped at startup
    #[serde(skip)]
    pub iota_version: Option<String>,
}

impl AgentConfig {
    /// Load configuration from a TOML file and apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> AgentResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| AgentError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;

        let mut config = Self::from_toml_str(&content).map_err(|source| AgentError::ConfigParse {
            path: path.display().to_string(),
            source,
        })?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply `IOTA_*` overrides looked up through `lookup`
    ///
    /// Recognized keys: `IOTA_CB_HOST`, `IOTA_CB_PORT`, `IOTA_CB_NGSI_VERSION`,
    /// `IOTA_NORTH_HOST`, `IOTA_NORTH_PORT`, `IOTA_LOG_LEVEL`, `IOTA_SERVICE`,
    /// `IOTA_SUBSERVICE`, `IOTA_PROVIDER_URL`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> AgentResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("IOTA_CB_HOST") {
            self.context_broker.host = host;
        }
        if let Some(port) = lookup("IOTA_CB_PORT") {
            self.context_broker.port = parse_port("IOTA_CB_PORT", &port)?;
        }
        if let Some(version) = lookup("IOTA_CB_NGSI_VERSION") {
            self.context_broker.ngsi_version =
                version.parse().map_err(|_| AgentError::InvalidOverride {
                    key: "IOTA_CB_NGSI_VERSION".to_string(),
                    value: version.clone(),
                })?;
        }
        if let Some(host) = lookup("IOTA_NORTH_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("IOTA_NORTH_PORT") {
            self.server.port = parse_port("IOTA_NORTH_PORT", &port)?;
        }
        if let Some(level) = lookup("IOTA_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(service) = lookup("IOTA_SERVICE") {
            self.service = service;
        }
        if let Some(subservice) = lookup("IOTA_SUBSERVICE") {
            self.subservice = subservice;
        }
        if let Some(url) = lookup("IOTA_PROVIDER_URL") {
            self.provider_url = Some(url);
        }
        Ok(())
    }

    /// Record the running agent version
    pub fn stamp_version(&mut self, version: impl Into<String>) {
        self.iota_version = Some(version.into());
    }

    /// `EnvFilter` directive derived from `log_level`
    pub fn log_filter(&self) -> String {
        log_filter_for(&self.log_level)
    }
}

/// `EnvFilter` directive for an IoT agent log level name
///
/// Unknown names map to `info`. Used directly when no config is loaded yet.
pub fn log_filter_for(log_level: &str) -> String {
    let level = match log_level.to_ascii_uppercase().as_str() {
        "TRACE" => "trace",
        "DEBUG" => "debug",
        "WARN" | "WARNING" => "warn",
        "ERROR" | "FATAL" => "error",
        _ => "info",
    };
    format!("lwm2m_agent={level},ngsi_client={level},tower_http={level}")
}

fn parse_port(key: &str, value: &str) -> AgentResult<u16> {
    value.trim().parse().map_err(|_| AgentError::InvalidOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}
