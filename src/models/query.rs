//! Query-related data models.
//!
//! [`Query`] carries an InfluxQL statement plus its target database and bound
//! parameters. [`QueryResult`] mirrors the JSON the `/query` endpoint returns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

/// Statement prefixes the server only accepts over POST.
const WRITE_STATEMENT_PREFIXES: &[&str] = &[
    "ALTER", "CREATE", "DELETE", "DROP", "GRANT", "KILL", "REVOKE",
];

/// An InfluxQL statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    command: String,
    database: Option<String>,
    params: Map<String, JsonValue>,
}

impl Query {
    /// Create a query not bound to any database.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            database: None,
            params: Map::new(),
        }
    }

    /// `CREATE DATABASE "<name>"`
    pub fn create_database(name: &str) -> Self {
        Self::new(format!("CREATE DATABASE {}", quote_identifier(name)))
    }

    /// `DROP DATABASE "<name>"`
    pub fn drop_database(name: &str) -> Self {
        Self::new(format!("DROP DATABASE {}", quote_identifier(name)))
    }

    /// `SHOW DATABASES`
    pub fn show_databases() -> Self {
        Self::new("SHOW DATABASES")
    }

    /// Run the statement against `database`.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Bind a `$name` placeholder.
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn params(&self) -> &Map<String, JsonValue> {
        &self.params
    }

    /// Whether the statement modifies server state and must be sent with POST.
    pub fn requires_post(&self) -> bool {
        let upper = self.command.trim_start().to_ascii_uppercase();
        if WRITE_STATEMENT_PREFIXES
            .iter()
            .any(|prefix| upper.starts_with(prefix))
        {
            return true;
        }
        upper.starts_with("SELECT")
            && upper
                .split_ascii_whitespace()
                .skip(1)
                .any(|token| token == "INTO")
    }
}

/// Quote an identifier for InfluxQL, escaping `\` and `"`.
pub fn quote_identifier(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Response body of the `/query` endpoint. In chunked mode each chunk is one of these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default)]
    pub results: Vec<StatementResult>,
    /// Request-level error, e.g. a parse failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    /// True if the request or any statement failed.
    pub fn has_error(&self) -> bool {
        self.first_error().is_some()
    }

    /// The request-level error, or else the first statement error.
    pub fn first_error(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or_else(|| self.results.iter().find_map(|r| r.error.as_deref()))
    }

    /// All series across all statements.
    pub fn series(&self) -> impl Iterator<Item = &Series> {
        self.results.iter().flat_map(|r| r.series.iter())
    }
}

/// Result of a single statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementResult {
    #[serde(default)]
    pub statement_id: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<Series>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// More chunks follow for this statement
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<JsonValue>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub partial: bool,
}

impl Series {
    /// Index of `column`, if present.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}
