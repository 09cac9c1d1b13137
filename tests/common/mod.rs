//! In-process fake InfluxDB 1.x server for integration tests.
//!
//! Serves `/query`, `/write` and `/ping` on an ephemeral port and records every
//! request it receives. Database statements update an in-memory database list
//! so `SHOW DATABASES` reflects earlier `CREATE`/`DROP` calls.

#![allow(dead_code)]

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const SERVER_VERSION: &str = "1.8.10";

/// Statement the fake rejects with a 400, the way a parse error is reported.
pub const BAD_STATEMENT: &str = "SELEKT nonsense";

/// Database the fake refuses writes for with a 404.
pub const MISSING_DATABASE: &str = "missing";

/// A request received by the fake server.
#[derive(Debug, Clone)]
pub struct Received {
    pub method: Method,
    pub path: String,
    pub params: HashMap<String, String>,
    pub body: String,
    pub authorization: Option<String>,
    pub accept_encoding: Option<String>,
}

#[derive(Debug, Default)]
pub struct FakeInflux {
    requests: Mutex<Vec<Received>>,
    databases: Mutex<Vec<String>>,
}

impl FakeInflux {
    pub fn requests(&self) -> Vec<Received> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests to `path`, ignoring everything else.
    pub fn requests_to(&self, path: &str) -> Vec<Received> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }

    pub fn databases(&self) -> Vec<String> {
        self.databases.lock().unwrap().clone()
    }

    fn record(&self, received: Received) {
        self.requests.lock().unwrap().push(received);
    }
}

/// Start a fake server and return it with its base URL.
pub async fn spawn() -> (Arc<FakeInflux>, String) {
    let server = Arc::new(FakeInflux::default());
    let app = Router::new()
        .route("/query", get(query).post(query))
        .route("/write", post(write))
        .route("/ping", get(ping))
        .with_state(server.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (server, format!("http://{addr}"))
}

/// A URL nothing listens on.
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn parse_form(raw: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}

fn received(
    method: Method,
    path: &str,
    params: HashMap<String, String>,
    headers: &HeaderMap,
    body: String,
) -> Received {
    Received {
        method,
        path: path.to_string(),
        params,
        body,
        authorization: header_value(headers, header::AUTHORIZATION),
        accept_encoding: header_value(headers, header::ACCEPT_ENCODING),
    }
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn unquote(name: &str) -> String {
    name.trim()
        .trim_matches('"')
        .replace("\\\"", "\"")
        .replace("\\\\", "\\")
}

fn series_result(name: &str, columns: &[&str], values: Vec<serde_json::Value>) -> serde_json::Value {
    json!({
        "results": [{
            "statement_id": 0,
            "series": [{ "name": name, "columns": columns, "values": values }]
        }]
    })
}

async fn query(
    State(server): State<Arc<FakeInflux>>,
    method: Method,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
    body: String,
) -> Response {
    let mut params = parse_form(raw.as_deref().unwrap_or_default());
    if method == Method::POST {
        params.extend(parse_form(&body));
    }
    let statement = params.get("q").cloned().unwrap_or_default();
    let chunked = params.get("chunked").is_some_and(|v| v == "true");
    server.record(received(method, "/query", params, &headers, body));

    if statement == BAD_STATEMENT {
        return (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({ "error": "error parsing query: found SELEKT" })),
        )
            .into_response();
    }

    if let Some(name) = statement.strip_prefix("CREATE DATABASE ") {
        let name = unquote(name);
        let mut databases = server.databases.lock().unwrap();
        if !databases.contains(&name) {
            databases.push(name);
        }
        return axum::Json(json!({ "results": [{ "statement_id": 0 }] })).into_response();
    }

    if let Some(name) = statement.strip_prefix("DROP DATABASE ") {
        let name = unquote(name);
        server.databases.lock().unwrap().retain(|db| *db != name);
        return axum::Json(json!({ "results": [{ "statement_id": 0 }] })).into_response();
    }

    if statement == "SHOW DATABASES" {
        let values = server
            .databases()
            .into_iter()
            .map(|db| json!([db]))
            .collect();
        return axum::Json(series_result("databases", &["name"], values)).into_response();
    }

    if chunked {
        let first = json!({
            "results": [{
                "statement_id": 0,
                "series": [{ "name": "cpu", "columns": ["time", "value"], "values": [[1000, 1.5]] }],
                "partial": true
            }]
        });
        let second = series_result("cpu", &["time", "value"], vec![json!([2000, 2.5])]);
        return (
            [(header::CONTENT_TYPE, "application/json")],
            format!("{first}\n{second}\n"),
        )
            .into_response();
    }

    axum::Json(series_result(
        "cpu",
        &["time", "value"],
        vec![json!([1000, 1.5]), json!([2000, 2.5])],
    ))
    .into_response()
}

async fn write(
    State(server): State<Arc<FakeInflux>>,
    headers: HeaderMap,
    RawQuery(raw): RawQuery,
    body: String,
) -> Response {
    let params = parse_form(raw.as_deref().unwrap_or_default());
    let database = params.get("db").cloned().unwrap_or_default();
    server.record(received(Method::POST, "/write", params, &headers, body));

    if database == MISSING_DATABASE {
        return (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "error": format!("database not found: \"{database}\"") })),
        )
            .into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn ping(State(server): State<Arc<FakeInflux>>, headers: HeaderMap) -> Response {
    server.record(received(
        Method::GET,
        "/ping",
        HashMap::new(),
        &headers,
        String::new(),
    ));
    (
        StatusCode::NO_CONTENT,
        [("X-Influxdb-Version", SERVER_VERSION)],
    )
        .into_response()
}
