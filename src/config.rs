//! Configuration handling for the InfluxDB template.
//!
//! [`InfluxProperties`] is the connection configuration. It deserializes from
//! camelCase keys (`connectTimeout`, `retentionPolicy`, ...) and doubles as a
//! clap argument group, so the binary can read it from flags and `INFLUX_*`
//! environment variables.

use crate::models::TimeUnit;
use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_URL: &str = "http://localhost:8086";
pub const DEFAULT_USERNAME: &str = "root";
pub const DEFAULT_PASSWORD: &str = "root";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_DATABASE: &str = "database";
pub const DEFAULT_RETENTION_POLICY: &str = "autogen";

/// Connection properties for an InfluxDB server.
#[derive(Clone, PartialEq, Eq, Args, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfluxProperties {
    /// Server URL, e.g. http://localhost:8086
    #[arg(long, default_value = DEFAULT_URL, env = "INFLUX_URL")]
    pub url: String,

    /// Username for basic authentication
    #[arg(long, default_value = DEFAULT_USERNAME, env = "INFLUX_USERNAME")]
    pub username: String,

    /// Password for basic authentication (sensitive - not logged)
    #[arg(
        long,
        default_value = DEFAULT_PASSWORD,
        env = "INFLUX_PASSWORD",
        hide_env_values = true,
        hide_default_value = true
    )]
    #[serde(skip_serializing)]
    pub password: String,

    /// Connect timeout in seconds
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS, env = "INFLUX_CONNECT_TIMEOUT")]
    #[serde(alias = "connect_timeout")]
    pub connect_timeout: u64,

    /// Write timeout in seconds
    #[arg(long, default_value_t = DEFAULT_WRITE_TIMEOUT_SECS, env = "INFLUX_WRITE_TIMEOUT")]
    #[serde(alias = "write_timeout")]
    pub write_timeout: u64,

    /// Read timeout in seconds
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_SECS, env = "INFLUX_READ_TIMEOUT")]
    #[serde(alias = "read_timeout")]
    pub read_timeout: u64,

    /// Request gzip-compressed responses
    #[arg(long, env = "INFLUX_GZIP")]
    pub gzip: bool,

    /// Target database, created if absent when a template is built
    #[arg(long, default_value = DEFAULT_DATABASE, env = "INFLUX_DATABASE")]
    pub database: String,

    /// Retention policy used for writes
    #[arg(long, default_value = DEFAULT_RETENTION_POLICY, env = "INFLUX_RETENTION_POLICY")]
    #[serde(alias = "retention_policy")]
    pub retention_policy: String,
}

impl InfluxProperties {
    /// Get the connect timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Get the write timeout as a Duration.
    pub fn write_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.write_timeout)
    }

    /// Get the read timeout as a Duration.
    pub fn read_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    /// Validate properties and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        let url = Url::parse(&self.url).map_err(|e| format!("Invalid URL '{}': {e}", self.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(format!(
                "Unsupported URL scheme '{}': expected http or https",
                url.scheme()
            ));
        }
        if self.database.trim().is_empty() {
            return Err("database must not be empty".to_string());
        }
        for (name, secs) in [
            ("connectTimeout", self.connect_timeout),
            ("writeTimeout", self.write_timeout),
            ("readTimeout", self.read_timeout),
        ] {
            if secs == 0 {
                return Err(format!("{name} must be greater than 0"));
            }
        }
        Ok(())
    }
}

impl Default for InfluxProperties {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            write_timeout: DEFAULT_WRITE_TIMEOUT_SECS,
            read_timeout: DEFAULT_READ_TIMEOUT_SECS,
            gzip: false,
            database: DEFAULT_DATABASE.to_string(),
            retention_policy: DEFAULT_RETENTION_POLICY.to_string(),
        }
    }
}

impl std::fmt::Debug for InfluxProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxProperties")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"****")
            .field("connect_timeout", &self.connect_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("gzip", &self.gzip)
            .field("database", &self.database)
            .field("retention_policy", &self.retention_policy)
            .finish()
    }
}

/// Command-line configuration for the `influxdb-template` binary.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "influxdb-template",
    about = "Inspect and write to an InfluxDB server through a typed template",
    version,
    author
)]
pub struct Config {
    #[command(flatten)]
    pub influx: InfluxProperties,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "INFLUX_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "INFLUX_JSON_LOGS")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Operations exposed by the binary.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check that the server is reachable
    Ping,
    /// Print the server version
    Version,
    /// Check whether a database exists (defaults to --database)
    Exists { name: Option<String> },
    /// Create a database (defaults to --database)
    CreateDatabase { name: Option<String> },
    /// Drop a database
    DropDatabase { name: String },
    /// Run an InfluxQL statement and print the result as JSON
    Query {
        /// InfluxQL statement
        command: String,
        /// Timestamp unit for result values (ns, u, ms, s, m, h)
        #[arg(long, conflicts_with = "chunk_size")]
        epoch: Option<TimeUnit>,
        /// Stream results in chunks of this many rows
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Write one point to the configured database and retention policy
    Write {
        /// Measurement name
        measurement: String,
        /// Tag as key=value, repeatable
        #[arg(long = "tag", value_name = "KEY=VALUE")]
        tags: Vec<String>,
        /// Field as key=value, repeatable; numbers and true/false are typed
        #[arg(long = "field", value_name = "KEY=VALUE", required = true)]
        fields: Vec<String>,
        /// Timestamp in milliseconds since the epoch (server time if omitted)
        #[arg(long)]
        time: Option<i64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_properties() {
        let props = InfluxProperties::default();
        assert_eq!(props.url, DEFAULT_URL);
        assert_eq!(props.retention_policy, DEFAULT_RETENTION_POLICY);
        assert!(!props.gzip);
        assert!(props.validate().is_ok());
    }

    #[test]
    fn test_timeout_durations() {
        let props = InfluxProperties {
            connect_timeout: 5,
            write_timeout: 15,
            read_timeout: 30,
            ..InfluxProperties::default()
        };
        assert_eq!(props.connect_timeout_duration(), Duration::from_secs(5));
        assert_eq!(props.write_timeout_duration(), Duration::from_secs(15));
        assert_eq!(props.read_timeout_duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_deserialize_camel_case_keys() {
        let props: InfluxProperties = serde_json::from_str(
            r#"{
                "url": "http://influx:8086",
                "username": "admin",
                "password": "secret",
                "connectTimeout": 3,
                "writeTimeout": 4,
                "readTimeout": 5,
                "gzip": true,
                "database": "metrics",
                "retentionPolicy": "one_week"
            }"#,
        )
        .unwrap();
        assert_eq!(props.url, "http://influx:8086");
        assert_eq!(props.connect_timeout, 3);
        assert_eq!(props.write_timeout, 4);
        assert_eq!(props.read_timeout, 5);
        assert!(props.gzip);
        assert_eq!(props.database, "metrics");
        assert_eq!(props.retention_policy, "one_week");
    }

    #[test]
    fn test_deserialize_snake_case_aliases_and_defaults() {
        let props: InfluxProperties =
            serde_json::from_str(r#"{"database": "metrics", "retention_policy": "rp"}"#).unwrap();
        assert_eq!(props.retention_policy, "rp");
        assert_eq!(props.url, DEFAULT_URL);
        assert_eq!(props.read_timeout, DEFAULT_READ_TIMEOUT_SECS);
    }

    #[test]
    fn test_password_not_serialized_or_logged() {
        let props = InfluxProperties {
            password: "hunter2".to_string(),
            ..InfluxProperties::default()
        };
        let json = serde_json::to_string(&props).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!format!("{props:?}").contains("hunter2"));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let props = InfluxProperties {
            url: "not a url".to_string(),
            ..InfluxProperties::default()
        };
        assert!(props.validate().unwrap_err().contains("Invalid URL"));

        let props = InfluxProperties {
            url: "udp://localhost:8089".to_string(),
            ..InfluxProperties::default()
        };
        assert!(props.validate().unwrap_err().contains("scheme"));
    }

    #[test]
    fn test_validate_rejects_empty_database_and_zero_timeout() {
        let props = InfluxProperties {
            database: "  ".to_string(),
            ..InfluxProperties::default()
        };
        assert!(props.validate().is_err());

        let props = InfluxProperties {
            write_timeout: 0,
            ..InfluxProperties::default()
        };
        assert_eq!(
            props.validate().unwrap_err(),
            "writeTimeout must be greater than 0"
        );
    }

    #[test]
    fn test_cli_parses_properties_and_command() {
        let config = Config::try_parse_from([
            "influxdb-template",
            "--url",
            "http://influx:8086",
            "--database",
            "metrics",
            "--gzip",
            "query",
            "SELECT * FROM cpu",
            "--epoch",
            "ms",
        ])
        .unwrap();
        assert_eq!(config.influx.url, "http://influx:8086");
        assert_eq!(config.influx.database, "metrics");
        assert!(config.influx.gzip);
        match config.command {
            Command::Query { command, epoch, .. } => {
                assert_eq!(command, "SELECT * FROM cpu");
                assert_eq!(epoch, Some(TimeUnit::Milliseconds));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_write_requires_field() {
        let result = Config::try_parse_from(["influxdb-template", "write", "cpu"]);
        assert!(result.is_err());
    }
}
