//! Memoized connection creation.
//!
//! A [`ConnectionFactory`] owns the [`InfluxProperties`] and at most one client
//! built from them. The client is created on the first call to
//! [`ConnectionFactory::connection`] and shared by every later caller.
//!
//! # Concurrency
//!
//! Creation goes through a `tokio::sync::OnceCell`, so concurrent first calls
//! build exactly one client. Once created the client is never rebuilt or
//! re-validated; replacing the properties afterwards has no effect on it.

use crate::client::{Connector, HttpConnector};
use crate::config::InfluxProperties;
use crate::error::{InfluxError, InfluxResult};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Produces and caches one client per factory.
pub struct ConnectionFactory<K: Connector = HttpConnector> {
    connector: K,
    properties: Option<InfluxProperties>,
    connection: OnceCell<Arc<K::Client>>,
}

impl ConnectionFactory<HttpConnector> {
    /// Create a factory connecting over HTTP.
    pub fn new(properties: InfluxProperties) -> Self {
        Self::with_connector(properties, HttpConnector)
    }

    /// Create an HTTP factory whose properties are supplied later.
    pub fn empty() -> Self {
        Self::unconfigured(HttpConnector)
    }
}

impl Default for ConnectionFactory<HttpConnector> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<K: Connector> ConnectionFactory<K> {
    pub fn with_connector(properties: InfluxProperties, connector: K) -> Self {
        Self {
            connector,
            properties: Some(properties),
            connection: OnceCell::new(),
        }
    }

    pub fn unconfigured(connector: K) -> Self {
        Self {
            connector,
            properties: None,
            connection: OnceCell::new(),
        }
    }

    /// Get the shared client, creating it on first use.
    ///
    /// Fails with [`InfluxError::ConfigurationMissing`] if no properties were
    /// supplied, or with the connector's error if the client cannot be built.
    /// A failed attempt leaves the cell empty so a later call tries again.
    pub async fn connection(&self) -> InfluxResult<Arc<K::Client>> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let properties = self
                    .properties
                    .as_ref()
                    .ok_or(InfluxError::ConfigurationMissing)?;
                let client = self.connector.connect(properties)?;
                debug!(
                    url = %properties.url,
                    gzip = properties.gzip,
                    "Created InfluxDB connection"
                );
                Ok::<_, InfluxError>(Arc::new(client))
            })
            .await?;
        Ok(Arc::clone(connection))
    }

    /// Whether the client has been created.
    pub fn is_connected(&self) -> bool {
        self.connection.initialized()
    }

    pub fn properties(&self) -> Option<&InfluxProperties> {
        self.properties.as_ref()
    }

    /// Replace the properties.
    ///
    /// An already created client keeps the configuration it was built with.
    pub fn set_properties(&mut self, properties: InfluxProperties) {
        if self.connection.initialized() {
            warn!(
                url = %properties.url,
                database = %properties.database,
                "Properties replaced after the connection was created; the existing connection keeps its configuration"
            );
        }
        self.properties = Some(properties);
    }

    /// Lifecycle checkpoint: properties must be present and valid.
    pub fn validate(&self) -> InfluxResult<&InfluxProperties> {
        let properties = self
            .properties
            .as_ref()
            .ok_or(InfluxError::ConfigurationMissing)?;
        properties
            .validate()
            .map_err(InfluxError::invalid_configuration)?;
        Ok(properties)
    }
}

impl<K: Connector> std::fmt::Debug for ConnectionFactory<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionFactory")
            .field("properties", &self.properties)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
