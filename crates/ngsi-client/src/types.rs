//! Request and response types for the context broker client

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{NgsiClientError, Result};

// =============================================================================
// Connection Types
// =============================================================================

/// Where a context broker lives and which tenant every call is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionParams {
    pub host: String,
    pub port: u16,
    /// Sent as `fiware-service`
    pub service: String,
    /// Sent as `fiware-servicepath`
    pub subservice: String,
}

impl ConnectionParams {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        service: impl Into<String>,
        subservice: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            service: service.into(),
            subservice: subservice.into(),
        }
    }

    /// Base URL of the broker (`http://host:port/`)
    pub fn base_url(&self) -> Result<Url> {
        Ok(Url::parse(&format!("http://{}:{}", self.host, self.port))?)
    }
}

// =============================================================================
// Entity/Attribute Types
// =============================================================================

/// Target context broker entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
}

impl EntityRef {
    /// Entity reference without a type
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: None,
        }
    }

    /// Entity reference with a type
    pub fn typed(id: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity_type: Some(entity_type.into()),
        }
    }
}

/// A single NGSI attribute to write
///
/// Serializes to the NGSI v1 attribute shape (`name`, `type`, `value`,
/// `metadata`). Name and type are not validated; the v2 encoder skips
/// attributes that lack either.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub attr_type: Option<String>,
    /// `None` leaves `value` out of the body entirely
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, attr_type: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            attr_type: Some(attr_type.into()),
            value: Some(value.into()),
            metadata: None,
        }
    }

    /// Attribute without a type (written by v1, skipped by v2)
    pub fn untyped(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            attr_type: None,
            value: Some(value.into()),
            metadata: None,
        }
    }

    /// Attribute with a type but no value
    pub fn valueless(name: impl Into<String>, attr_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attr_type: Some(attr_type.into()),
            value: None,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// True when both name and type are present and non-empty
    pub fn is_writable(&self) -> bool {
        !self.name.is_empty() && self.attr_type.as_deref().is_some_and(|t| !t.is_empty())
    }
}

// =============================================================================
// Dialect Types
// =============================================================================

/// NGSI protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    V1,
    V2,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::V1 => write!(f, "v1"),
            Dialect::V2 => write!(f, "v2"),
        }
    }
}

impl FromStr for Dialect {
    type Err = NgsiClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "1" => Ok(Dialect::V1),
            "v2" | "2" => Ok(Dialect::V2),
            other => Err(NgsiClientError::UnknownDialect(other.to_string())),
        }
    }
}

/// Answers "which NGSI dialect is current?" at call time
pub trait DialectSource: Send + Sync + fmt::Debug {
    fn dialect(&self) -> Dialect;
}

impl DialectSource for Dialect {
    fn dialect(&self) -> Dialect {
        *self
    }
}

/// Process-wide dialect flag that can be flipped while clients are in use
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct SharedDialect {
    v2: Arc<AtomicBool>,
}

impl SharedDialect {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            v2: Arc::new(AtomicBool::new(dialect == Dialect::V2)),
        }
    }

    pub fn set(&self, dialect: Dialect) {
        self.v2.store(dialect == Dialect::V2, Ordering::Relaxed);
    }
}

impl DialectSource for SharedDialect {
    fn dialect(&self) -> Dialect {
        if self.v2.load(Ordering::Relaxed) {
            Dialect::V2
        } else {
            Dialect::V1
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Raw result of one context broker exchange
///
/// Returned for every status code; callers decide what a 4xx/5xx means.
#[derive(Debug, Clone)]
pub struct NgsiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl NgsiResponse {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(Self {
            status,
            headers,
            body,
        })
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Parse the body as JSON
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}
