//! Typed access to one database.
//!
//! An [`InfluxTemplate<T>`] binds a client, the properties it was built from
//! and a [`Converter`] turning `T` into a [`Point`]. Writes go to the
//! configured database and retention policy; every other operation is a
//! single call on the client whose error is returned unchanged.
//!
//! # Usage
//!
//! ```ignore
//! let factory = ConnectionFactory::new(properties);
//! let template = InfluxTemplate::new(&factory, |s: &Sample| {
//!     Point::measurement("samples")
//!         .field("value", s.value)
//!         .time(s.ts, TimeUnit::Milliseconds)
//!         .build()
//! })
//! .await?;
//!
//! template.write(&sample).await?;
//! template.write_all(&samples).await?;
//! ```
//!
//! Hosts that wire the converter late use [`TemplateBuilder`]: it performs the
//! same connection and database setup, and [`TemplateBuilder::build`] refuses
//! to produce a template until a converter is bound.

use crate::client::{Connector, HttpClient, InfluxClient};
use crate::config::InfluxProperties;
use crate::db::ConnectionFactory;
use crate::error::{InfluxError, InfluxResult};
use crate::models::{BatchPoints, ConsistencyLevel, Point, Pong, Query, QueryResult, TimeUnit};
use std::sync::Arc;
use tracing::debug;

/// Maps a model to an insertable point.
///
/// Implemented for any `Fn(&T) -> Point`, so plain functions and closures work.
pub trait Converter<T>: Send + Sync {
    fn convert(&self, model: &T) -> Point;
}

impl<T, F> Converter<T> for F
where
    F: Fn(&T) -> Point + Send + Sync,
{
    fn convert(&self, model: &T) -> Point {
        self(model)
    }
}

/// Typed operations on the configured database.
pub struct InfluxTemplate<T, C: InfluxClient = HttpClient> {
    connection: Arc<C>,
    properties: InfluxProperties,
    converter: Arc<dyn Converter<T>>,
}

impl<T, C: InfluxClient> InfluxTemplate<T, C> {
    /// Connect through `factory`, create the configured database if absent and
    /// bind `converter`.
    pub async fn new<K, V>(factory: &ConnectionFactory<K>, converter: V) -> InfluxResult<Self>
    where
        K: Connector<Client = C>,
        V: Converter<T> + 'static,
    {
        TemplateBuilder::from_factory(factory)
            .await?
            .converter(converter)
            .build()
    }

    /// Start a template without touching the server.
    pub fn builder() -> TemplateBuilder<T, C> {
        TemplateBuilder::new()
    }

    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    pub fn properties(&self) -> &InfluxProperties {
        &self.properties
    }

    pub fn converter(&self) -> &dyn Converter<T> {
        self.converter.as_ref()
    }

    /// Create a database. The statement result is not inspected.
    pub async fn create_database(&self, name: &str) -> InfluxResult<()> {
        create_database(self.connection.as_ref(), name).await
    }

    /// Drop a database. The statement result is not inspected.
    pub async fn delete_database(&self, name: &str) -> InfluxResult<()> {
        debug!(database = %name, "Dropping database");
        self.connection.query(&Query::drop_database(name)).await?;
        Ok(())
    }

    pub async fn database_exists(&self, name: &str) -> InfluxResult<bool> {
        Ok(self.connection.database_exists(name).await?)
    }

    /// Convert and write one model.
    pub async fn write(&self, model: &T) -> InfluxResult<()> {
        let point = self.converter.convert(model);
        self.connection
            .write_point(
                &self.properties.database,
                &self.properties.retention_policy,
                point,
            )
            .await?;
        Ok(())
    }

    /// Convert every model and write them as one batch acknowledged by all replicas.
    ///
    /// Accepts slices, `&Vec<T>` or any iterator of references. The batch
    /// succeeds or fails as a unit.
    pub async fn write_all<'a, I>(&self, models: I) -> InfluxResult<()>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let batch = BatchPoints::database(&self.properties.database)
            .retention_policy(&self.properties.retention_policy)
            .consistency(ConsistencyLevel::All)
            .points(models.into_iter().map(|m| self.converter.convert(m)))
            .build();
        debug!(
            database = %batch.database_name(),
            points = batch.len(),
            "Writing batch"
        );
        self.connection.write_batch(batch).await?;
        Ok(())
    }

    pub async fn query(&self, query: &Query) -> InfluxResult<QueryResult> {
        Ok(self.connection.query(query).await?)
    }

    /// Query with result timestamps as integers in `unit`.
    pub async fn query_with_unit(
        &self,
        query: &Query,
        unit: TimeUnit,
    ) -> InfluxResult<QueryResult> {
        Ok(self.connection.query_with_unit(query, unit).await?)
    }

    /// Stream a query in chunks of `chunk_size` rows; `on_chunk` runs on the calling task.
    pub async fn query_chunked<F>(
        &self,
        query: &Query,
        chunk_size: usize,
        on_chunk: F,
    ) -> InfluxResult<()>
    where
        F: FnMut(QueryResult) + Send,
    {
        Ok(self
            .connection
            .query_chunked(query, chunk_size, on_chunk)
            .await?)
    }

    pub async fn ping(&self) -> InfluxResult<Pong> {
        Ok(self.connection.ping().await?)
    }

    pub async fn version(&self) -> InfluxResult<String> {
        Ok(self.connection.version().await?)
    }
}

impl<T, C: InfluxClient> std::fmt::Debug for InfluxTemplate<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxTemplate")
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

async fn create_database<C: InfluxClient>(connection: &C, name: &str) -> InfluxResult<()> {
    debug!(database = %name, "Creating database");
    connection.query(&Query::create_database(name)).await?;
    Ok(())
}

/// Two-phase construction of an [`InfluxTemplate`].
///
/// A builder may lack any of its parts; [`TemplateBuilder::build`] is the
/// checkpoint that reports what is missing.
pub struct TemplateBuilder<T, C: InfluxClient = HttpClient> {
    connection: Option<Arc<C>>,
    properties: Option<InfluxProperties>,
    converter: Option<Arc<dyn Converter<T>>>,
}

impl<T, C: InfluxClient> TemplateBuilder<T, C> {
    pub fn new() -> Self {
        Self {
            connection: None,
            properties: None,
            converter: None,
        }
    }

    /// Take the connection and properties from `factory` and create the
    /// configured database if absent.
    pub async fn from_factory<K>(factory: &ConnectionFactory<K>) -> InfluxResult<Self>
    where
        K: Connector<Client = C>,
    {
        let connection = factory.connection().await?;
        let properties = factory
            .properties()
            .cloned()
            .ok_or(InfluxError::ConfigurationMissing)?;
        create_database(connection.as_ref(), &properties.database).await?;
        Ok(Self {
            connection: Some(connection),
            properties: Some(properties),
            converter: None,
        })
    }

    pub fn connection(mut self, connection: Arc<C>) -> Self {
        self.connection = Some(connection);
        self
    }

    pub fn properties(mut self, properties: InfluxProperties) -> Self {
        self.properties = Some(properties);
        self
    }

    pub fn converter<V>(mut self, converter: V) -> Self
    where
        V: Converter<T> + 'static,
    {
        self.converter = Some(Arc::new(converter));
        self
    }

    /// Bind a converter that is shared with other templates or the caller.
    pub fn shared_converter(mut self, converter: Arc<dyn Converter<T>>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Whether a write would be possible once built.
    pub fn has_converter(&self) -> bool {
        self.converter.is_some()
    }

    /// Lifecycle checkpoint: fails with [`InfluxError::IncompleteConfiguration`]
    /// naming every absent part.
    pub fn build(self) -> InfluxResult<InfluxTemplate<T, C>> {
        match (self.connection, self.properties, self.converter) {
            (Some(connection), Some(properties), Some(converter)) => Ok(InfluxTemplate {
                connection,
                properties,
                converter,
            }),
            (connection, properties, converter) => {
                let mut missing = Vec::new();
                if connection.is_none() {
                    missing.push("connection");
                }
                if properties.is_none() {
                    missing.push("properties");
                }
                if converter.is_none() {
                    missing.push("converter");
                }
                Err(InfluxError::incomplete(missing))
            }
        }
    }
}

impl<T, C: InfluxClient> Default for TemplateBuilder<T, C> {
    fn default() -> Self {
        Self::new()
    }
}
