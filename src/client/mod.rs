//! Client layer for the InfluxDB server.
//!
//! [`InfluxClient`] is the seam between the template and the wire: every
//! template operation is a single call on it. [`Connector`] turns
//! [`InfluxProperties`] into a client and is what the
//! [`ConnectionFactory`](crate::db::ConnectionFactory) memoizes.
//!
//! - `http`: the InfluxDB 1.x HTTP API implementation

pub mod http;
#[cfg(test)]
pub(crate) mod mock;

pub use http::{HttpClient, HttpConnector};

use crate::config::InfluxProperties;
use crate::error::ClientResult;
use crate::models::{BatchPoints, Point, Pong, Query, QueryResult, TimeUnit};
use std::future::Future;

/// Operations the server supports, in its own terms.
///
/// Implementations report failures as [`ClientError`](crate::error::ClientError)
/// and never retry.
pub trait InfluxClient: Send + Sync {
    /// Run a statement.
    fn query(&self, query: &Query) -> impl Future<Output = ClientResult<QueryResult>> + Send;

    /// Run a statement, returning timestamps as integers in `unit`.
    fn query_with_unit(
        &self,
        query: &Query,
        unit: TimeUnit,
    ) -> impl Future<Output = ClientResult<QueryResult>> + Send;

    /// Run a statement in chunked mode, handing each chunk to `on_chunk` as it arrives.
    fn query_chunked<F>(
        &self,
        query: &Query,
        chunk_size: usize,
        on_chunk: F,
    ) -> impl Future<Output = ClientResult<()>> + Send
    where
        F: FnMut(QueryResult) + Send;

    /// Write a single point.
    fn write_point(
        &self,
        database: &str,
        retention_policy: &str,
        point: Point,
    ) -> impl Future<Output = ClientResult<()>> + Send;

    /// Write a batch in one request.
    fn write_batch(&self, batch: BatchPoints) -> impl Future<Output = ClientResult<()>> + Send;

    /// Health check.
    fn ping(&self) -> impl Future<Output = ClientResult<Pong>> + Send;

    /// Server version as reported by a ping.
    fn version(&self) -> impl Future<Output = ClientResult<String>> + Send {
        async move { Ok(self.ping().await?.version) }
    }

    /// Names of all databases on the server.
    fn describe_databases(&self) -> impl Future<Output = ClientResult<Vec<String>>> + Send;

    /// Whether a database named exactly `name` exists.
    fn database_exists(&self, name: &str) -> impl Future<Output = ClientResult<bool>> + Send {
        async move {
            let databases = self.describe_databases().await?;
            Ok(databases.iter().any(|db| db == name))
        }
    }
}

/// Builds a client from properties.
pub trait Connector: Send + Sync {
    type Client: InfluxClient;

    fn connect(&self, properties: &InfluxProperties) -> ClientResult<Self::Client>;
}

/// Extract database names from a `SHOW DATABASES` result.
pub(crate) fn database_names(result: &QueryResult) -> Vec<String> {
    result
        .series()
        .flat_map(|s| s.values.iter())
        .filter_map(|row| row.first().and_then(|v| v.as_str()))
        .map(|name| name.trim().to_string())
        .collect()
}
