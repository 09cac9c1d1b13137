//! Recording fake client for unit tests.

use crate::client::{Connector, InfluxClient};
use crate::config::InfluxProperties;
use crate::error::{ClientError, ClientResult};
use crate::models::{BatchPoints, Point, Pong, Query, QueryResult, TimeUnit};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A call received by [`MockClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Query(String),
    QueryWithUnit(String, TimeUnit),
    QueryChunked(String, usize),
    WritePoint {
        database: String,
        retention_policy: String,
        point: Point,
    },
    WriteBatch(BatchPoints),
    Ping,
    DescribeDatabases,
}

#[derive(Debug, Default)]
pub struct MockClient {
    calls: Mutex<Vec<Call>>,
    databases: Vec<String>,
    chunks: Vec<QueryResult>,
    fail_writes: bool,
}

impl MockClient {
    pub fn with_databases(databases: &[&str]) -> Self {
        Self {
            databases: databases.iter().map(|d| d.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn with_chunks(chunks: Vec<QueryResult>) -> Self {
        Self {
            chunks,
            ..Self::default()
        }
    }

    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn write_result(&self) -> ClientResult<()> {
        if self.fail_writes {
            Err(ClientError::server(500, "timeout"))
        } else {
            Ok(())
        }
    }
}

impl InfluxClient for MockClient {
    async fn query(&self, query: &Query) -> ClientResult<QueryResult> {
        self.record(Call::Query(query.command().to_string()));
        Ok(QueryResult::default())
    }

    async fn query_with_unit(&self, query: &Query, unit: TimeUnit) -> ClientResult<QueryResult> {
        self.record(Call::QueryWithUnit(query.command().to_string(), unit));
        Ok(QueryResult::default())
    }

    async fn query_chunked<F>(
        &self,
        query: &Query,
        chunk_size: usize,
        mut on_chunk: F,
    ) -> ClientResult<()>
    where
        F: FnMut(QueryResult) + Send,
    {
        self.record(Call::QueryChunked(query.command().to_string(), chunk_size));
        for chunk in &self.chunks {
            on_chunk(chunk.clone());
        }
        Ok(())
    }

    async fn write_point(
        &self,
        database: &str,
        retention_policy: &str,
        point: Point,
    ) -> ClientResult<()> {
        self.record(Call::WritePoint {
            database: database.to_string(),
            retention_policy: retention_policy.to_string(),
            point,
        });
        self.write_result()
    }

    async fn write_batch(&self, batch: BatchPoints) -> ClientResult<()> {
        self.record(Call::WriteBatch(batch));
        self.write_result()
    }

    async fn ping(&self) -> ClientResult<Pong> {
        self.record(Call::Ping);
        Ok(Pong {
            version: "1.8.10".to_string(),
            response_time: Duration::from_millis(1),
        })
    }

    async fn describe_databases(&self) -> ClientResult<Vec<String>> {
        self.record(Call::DescribeDatabases);
        Ok(self.databases.clone())
    }
}

/// Counts how many clients it has built.
#[derive(Debug, Default)]
pub struct MockConnector {
    pub connects: AtomicUsize,
    pub databases: Vec<&'static str>,
}

impl MockConnector {
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for MockConnector {
    type Client = MockClient;

    fn connect(&self, _properties: &InfluxProperties) -> ClientResult<MockClient> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(MockClient::with_databases(&self.databases))
    }
}

/// Connector that always fails, as an unreachable transport would.
#[derive(Debug, Default)]
pub struct FailingConnector;

impl Connector for FailingConnector {
    type Client = MockClient;

    fn connect(&self, properties: &InfluxProperties) -> ClientResult<MockClient> {
        Err(ClientError::invalid_url(&properties.url, "refused"))
    }
}
