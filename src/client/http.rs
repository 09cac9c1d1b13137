//! InfluxDB 1.x HTTP API client.
//!
//! Speaks the `/query`, `/write` and `/ping` endpoints with `reqwest`:
//! - connect and read timeouts are set on the underlying client, the write
//!   timeout on each write request
//! - credentials go out as HTTP basic auth
//! - gzip response decoding is enabled when the `gzip` property is set
//! - chunked queries read the body as a stream of newline-delimited JSON objects

use crate::client::{Connector, InfluxClient, database_names};
use crate::config::InfluxProperties;
use crate::error::{ClientError, ClientResult};
use crate::models::ping::UNKNOWN_VERSION;
use crate::models::{
    BatchPoints, ConsistencyLevel, Point, Pong, Query, QueryResult, TimeUnit,
};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

const VERSION_HEADER: &str = "X-Influxdb-Version";

type Params = Vec<(&'static str, String)>;

/// HTTP client for one InfluxDB server.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    /// Always ends with `/` so endpoints join below it
    base_url: Url,
    username: String,
    password: String,
    write_timeout: Duration,
    gzip: bool,
}

impl HttpClient {
    /// Build a client for the server described by `properties`.
    ///
    /// No request is sent; an unreachable server shows up on first use.
    pub fn connect(properties: &InfluxProperties) -> ClientResult<Self> {
        let mut base_url = Url::parse(&properties.url)
            .map_err(|e| ClientError::invalid_url(&properties.url, e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ClientError::invalid_url(
                &properties.url,
                "expected an http or https URL",
            ));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(properties.connect_timeout_duration())
            .read_timeout(properties.read_timeout_duration())
            .gzip(properties.gzip)
            .build()?;

        Ok(Self {
            client,
            base_url,
            username: properties.username.clone(),
            password: properties.password.clone(),
            write_timeout: properties.write_timeout_duration(),
            gzip: properties.gzip,
        })
    }

    /// Base URL of the server.
    pub fn url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_gzip_enabled(&self) -> bool {
        self.gzip
    }

    fn endpoint(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::invalid_url(self.base_url.as_str(), e.to_string()))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.username.is_empty() {
            request
        } else {
            request.basic_auth(&self.username, Some(&self.password))
        }
    }

    fn query_request(&self, query: &Query, extra: Params) -> ClientResult<RequestBuilder> {
        let url = self.endpoint("query")?;
        let mut params: Params = vec![("q", query.command().to_string())];
        if let Some(database) = query.database() {
            params.push(("db", database.to_string()));
        }
        if !query.params().is_empty() {
            params.push((
                "params",
                JsonValue::Object(query.params().clone()).to_string(),
            ));
        }
        params.extend(extra);

        let request = if query.requires_post() {
            self.client.post(url).form(&params)
        } else {
            self.client.get(url).query(&params)
        };
        Ok(self.authorize(request))
    }

    async fn run_query(&self, query: &Query, extra: Params) -> ClientResult<QueryResult> {
        debug!(
            query = %query.command(),
            database = ?query.database(),
            "Executing query"
        );
        let response = self.query_request(query, extra)?.send().await?;
        let body = check_status(response).await?.bytes().await?;
        decode_result(&body)
    }

    fn write_request(
        &self,
        database: &str,
        retention_policy: Option<&str>,
        consistency: Option<ConsistencyLevel>,
        precision: TimeUnit,
        body: String,
    ) -> ClientResult<RequestBuilder> {
        let url = self.endpoint("write")?;
        let mut params: Params = vec![
            ("db", database.to_string()),
            ("precision", precision.as_str().to_string()),
        ];
        if let Some(rp) = retention_policy.filter(|rp| !rp.is_empty()) {
            params.push(("rp", rp.to_string()));
        }
        if let Some(consistency) = consistency {
            params.push(("consistency", consistency.as_str().to_string()));
        }

        let request = self
            .client
            .post(url)
            .query(&params)
            .timeout(self.write_timeout)
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body);
        Ok(self.authorize(request))
    }

    async fn write_lines(
        &self,
        database: &str,
        retention_policy: Option<&str>,
        consistency: Option<ConsistencyLevel>,
        precision: TimeUnit,
        body: String,
    ) -> ClientResult<()> {
        debug!(
            database,
            retention_policy = ?retention_policy,
            consistency = ?consistency,
            bytes = body.len(),
            "Writing points"
        );
        let request =
            self.write_request(database, retention_policy, consistency, precision, body)?;
        check_status(request.send().await?).await?;
        Ok(())
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.username)
            .field("write_timeout", &self.write_timeout)
            .field("gzip", &self.gzip)
            .finish_non_exhaustive()
    }
}

impl InfluxClient for HttpClient {
    async fn query(&self, query: &Query) -> ClientResult<QueryResult> {
        self.run_query(query, Vec::new()).await
    }

    async fn query_with_unit(&self, query: &Query, unit: TimeUnit) -> ClientResult<QueryResult> {
        self.run_query(query, vec![("epoch", unit.as_str().to_string())])
            .await
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
        debug!(
            query = %query.command(),
            database = ?query.database(),
            chunk_size,
            "Executing chunked query"
        );
        let extra = vec![
            ("chunked", "true".to_string()),
            ("chunk_size", chunk_size.to_string()),
        ];
        let response = self.query_request(query, extra)?.send().await?;
        let mut stream = check_status(response).await?.bytes_stream();

        let mut buffer: Vec<u8> = Vec::new();
        let mut chunks = 0usize;
        while let Some(bytes) = stream.next().await {
            buffer.extend_from_slice(&bytes?);
            while let Some(newline) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                chunks += emit_chunk(&line, &mut on_chunk)?;
            }
        }
        chunks += emit_chunk(&buffer, &mut on_chunk)?;

        debug!(chunks, "Chunked query complete");
        Ok(())
    }

    async fn write_point(
        &self,
        database: &str,
        retention_policy: &str,
        point: Point,
    ) -> ClientResult<()> {
        point.validate()?;
        let precision = point.precision();
        self.write_lines(
            database,
            Some(retention_policy),
            None,
            precision,
            point.to_line_protocol(),
        )
        .await
    }

    async fn write_batch(&self, batch: BatchPoints) -> ClientResult<()> {
        if batch.is_empty() {
            debug!(database = %batch.database_name(), "Skipping empty batch");
            return Ok(());
        }
        for point in batch.points() {
            point.validate()?;
        }
        self.write_lines(
            batch.database_name(),
            batch.retention_policy(),
            batch.consistency(),
            batch.precision(),
            batch.line_protocol(),
        )
        .await
    }

    async fn ping(&self) -> ClientResult<Pong> {
        let url = self.endpoint("ping")?;
        let started = Instant::now();
        let response = check_status(self.authorize(self.client.get(url)).send().await?).await?;
        let version = response
            .headers()
            .get(VERSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(UNKNOWN_VERSION)
            .to_string();
        Ok(Pong {
            version,
            response_time: started.elapsed(),
        })
    }

    async fn describe_databases(&self) -> ClientResult<Vec<String>> {
        let result = self.query(&Query::show_databases()).await?;
        if let Some(error) = result.first_error() {
            return Err(ClientError::query(error));
        }
        Ok(database_names(&result))
    }
}

/// Connects with [`HttpClient::connect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl Connector for HttpConnector {
    type Client = HttpClient;

    fn connect(&self, properties: &InfluxProperties) -> ClientResult<HttpClient> {
        HttpClient::connect(properties)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Turn a non-2xx response into [`ClientError::Server`], preferring the JSON `error` field.
async fn check_status(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .unwrap_or_else(|| body.trim().to_string());
    Err(ClientError::server(status.as_u16(), message))
}

fn decode_result(body: &[u8]) -> ClientResult<QueryResult> {
    serde_json::from_slice(body).map_err(|e| ClientError::decode(e.to_string()))
}

fn emit_chunk<F: FnMut(QueryResult)>(line: &[u8], on_chunk: &mut F) -> ClientResult<usize> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(0);
    }
    on_chunk(decode_result(line)?);
    Ok(1)
}
