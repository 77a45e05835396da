//! Context broker HTTP client implementation

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::payload::{self, NgsiRequest};
use crate::types::*;

/// Tenant header
pub const FIWARE_SERVICE: &str = "fiware-service";
/// Sub-tenant header
pub const FIWARE_SERVICE_PATH: &str = "fiware-servicepath";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// NGSI context broker client
///
/// Sends one POST per call and hands back whatever the broker answered. The
/// dialect for `update` and `query` is read from the [`DialectSource`] on
/// every call, so flipping a [`SharedDialect`] takes effect immediately.
#[derive(Debug, Clone)]
pub struct NgsiClient {
    client: Client,
    dialect: Arc<dyn DialectSource>,
}

impl NgsiClient {
    /// Create a new client
    pub fn new(dialect: impl DialectSource + 'static) -> Result<Self> {
        Self::with_config(dialect, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new client with custom timeouts
    pub fn with_config(
        dialect: impl DialectSource + 'static,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        Ok(Self {
            client,
            dialect: Arc::new(dialect),
        })
    }

    /// Dialect `update` and `query` would use right now
    pub fn dialect(&self) -> Dialect {
        self.dialect.dialect()
    }

    /// Bind connection parameters, dispatching on the dialect source
    pub fn create_client(
        &self,
        host: impl Into<String>,
        port: u16,
        service: impl Into<String>,
        subservice: impl Into<String>,
    ) -> BoundClient {
        self.bind(ConnectionParams::new(host, port, service, subservice))
    }

    /// Bind connection parameters, always speaking NGSI v2
    pub fn create_client_v2(
        &self,
        host: impl Into<String>,
        port: u16,
        service: impl Into<String>,
        subservice: impl Into<String>,
    ) -> BoundClient {
        self.bind_v2(ConnectionParams::new(host, port, service, subservice))
    }

    pub fn bind(&self, connection: ConnectionParams) -> BoundClient {
        BoundClient {
            client: self.clone(),
            connection,
            pinned: None,
        }
    }

    pub fn bind_v2(&self, connection: ConnectionParams) -> BoundClient {
        BoundClient {
            client: self.clone(),
            connection,
            pinned: Some(Dialect::V2),
        }
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Update entity attributes in the current dialect
    #[instrument(skip(self, connection, attributes))]
    pub async fn update(
        &self,
        connection: &ConnectionParams,
        entity: &EntityRef,
        attributes: &[Attribute],
    ) -> Result<NgsiResponse> {
        let request = payload::update(self.dialect(), entity, attributes)?;
        self.send(connection, request).await
    }

    /// Update entity attributes through `/v1/updateContext`
    #[instrument(skip(self, connection, attributes))]
    pub async fn update_v1(
        &self,
        connection: &ConnectionParams,
        entity: &EntityRef,
        attributes: &[Attribute],
    ) -> Result<NgsiResponse> {
        let request = payload::update_v1(entity, attributes)?;
        self.send(connection, request).await
    }

    /// Update entity attributes through `/v2/op/update`
    #[instrument(skip(self, connection, attributes))]
    pub async fn update_v2(
        &self,
        connection: &ConnectionParams,
        entity: &EntityRef,
        attributes: &[Attribute],
    ) -> Result<NgsiResponse> {
        let request = payload::update_v2(entity, attributes)?;
        self.send(connection, request).await
    }

    // =========================================================================
    // Query
    // =========================================================================

    /// Query entity attributes in the current dialect
    #[instrument(skip(self, connection))]
    pub async fn query(
        &self,
        connection: &ConnectionParams,
        entity: &EntityRef,
        attributes: &[String],
    ) -> Result<NgsiResponse> {
        let request = payload::query(self.dialect(), entity, attributes)?;
        self.send(connection, request).await
    }

    /// Query entity attributes through `/v1/queryContext`
    #[instrument(skip(self, connection))]
    pub async fn query_v1(
        &self,
        connection: &ConnectionParams,
        entity: &EntityRef,
        attributes: &[String],
    ) -> Result<NgsiResponse> {
        let request = payload::query_v1(entity, attributes)?;
        self.send(connection, request).await
    }

    /// Query entity attributes through `/v2/op/query`
    #[instrument(skip(self, connection))]
    pub async fn query_v2(
        &self,
        connection: &ConnectionParams,
        entity: &EntityRef,
        attributes: &[String],
    ) -> Result<NgsiResponse> {
        let request = payload::query_v2(entity, attributes)?;
        self.send(connection, request).await
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Find the context providers registered for entity attributes
    ///
    /// Always NGSI v1; the dialect source is not consulted.
    #[instrument(skip(self, connection))]
    pub async fn discover(
        &self,
        connection: &ConnectionParams,
        entity: &EntityRef,
        attributes: &[String],
    ) -> Result<NgsiResponse> {
        let request = payload::discover(entity, attributes)?;
        self.send(connection, request).await
    }

    // =========================================================================
    // Transport
    // =========================================================================

    /// POST a prebuilt request to the broker with the tenant headers
    pub async fn send(
        &self,
        connection: &ConnectionParams,
        request: NgsiRequest,
    ) -> Result<NgsiResponse> {
        let url = connection.base_url()?.join(request.path)?;
        debug!(
            operation = ?request.operation,
            dialect = %request.dialect,
            service = %connection.service,
            subservice = %connection.subservice,
            "POST {}",
            url
        );

        let response = self
            .client
            .post(url)
            .header(FIWARE_SERVICE, connection.service.as_str())
            .header(FIWARE_SERVICE_PATH, connection.subservice.as_str())
            .json(&request.body)
            .send()
            .await?;

        let response = NgsiResponse::read(response).await?;
        debug!(status = %response.status, "Context broker responded");
        Ok(response)
    }
}

/// A client with connection parameters bound in
///
/// Call sites only pass entity and attribute data. Built by
/// [`NgsiClient::create_client`] or [`NgsiClient::create_client_v2`].
#[derive(Debug, Clone)]
pub struct BoundClient {
    client: NgsiClient,
    connection: ConnectionParams,
    pinned: Option<Dialect>,
}

impl BoundClient {
    pub fn connection(&self) -> &ConnectionParams {
        &self.connection
    }

    /// Dialect the next `update`/`query` will use
    pub fn dialect(&self) -> Dialect {
        self.pinned.unwrap_or_else(|| self.client.dialect())
    }

    pub async fn update(&self, entity: &EntityRef, attributes: &[Attribute]) -> Result<NgsiResponse> {
        match self.pinned {
            Some(Dialect::V2) => self.client.update_v2(&self.connection, entity, attributes).await,
            Some(Dialect::V1) => self.client.update_v1(&self.connection, entity, attributes).await,
            None => self.client.update(&self.connection, entity, attributes).await,
        }
    }

    pub async fn query(&self, entity: &EntityRef, attributes: &[String]) -> Result<NgsiResponse> {
        match self.pinned {
            Some(Dialect::V2) => self.client.query_v2(&self.connection, entity, attributes).await,
            Some(Dialect::V1) => self.client.query_v1(&self.connection, entity, attributes).await,
            None => self.client.query(&self.connection, entity, attributes).await,
        }
    }

    pub async fn discover(&self, entity: &EntityRef, attributes: &[String]) -> Result<NgsiResponse> {
        self.client.discover(&self.connection, entity, attributes).await
    }
}
