//! InfluxDB Template - command line entry point.
//!
//! Runs one operation against the server described by the `--url`/`INFLUX_*`
//! properties and prints the result to stdout. Logs go to stderr.

use clap::Parser;
use influxdb_template::client::InfluxClient;
use influxdb_template::config::{Command, Config};
use influxdb_template::db::{ConnectionFactory, InfluxTemplate};
use influxdb_template::error::{InfluxError, InfluxResult};
use influxdb_template::models::{FieldValue, Point, Query, TimeUnit};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// One point given on the command line.
struct Record {
    measurement: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, FieldValue)>,
    time: Option<i64>,
}

fn record_point(record: &Record) -> Point {
    let builder = Point::measurement(&record.measurement)
        .tags(record.tags.iter().cloned())
        .fields(record.fields.iter().cloned());
    match record.time {
        Some(time) => builder.time(time, TimeUnit::Milliseconds).build(),
        None => builder.build(),
    }
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// `42i` is an integer, `true`/`false` a boolean, anything numeric a float,
/// everything else a string.
fn parse_field_value(s: &str) -> FieldValue {
    if let Some(Ok(v)) = s.strip_suffix('i').map(str::parse::<i64>) {
        return FieldValue::Integer(v);
    }
    match s {
        "true" => FieldValue::Boolean(true),
        "false" => FieldValue::Boolean(false),
        _ => s
            .parse::<f64>()
            .map(FieldValue::Float)
            .unwrap_or_else(|_| FieldValue::String(s.to_string())),
    }
}

fn print_json<T: Serialize>(value: &T, pretty: bool) {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    match rendered {
        Ok(json) => println!("{json}"),
        Err(e) => error!(error = %e, "Failed to render result"),
    }
}

async fn run(factory: &ConnectionFactory, command: Command) -> InfluxResult<()> {
    let properties = factory.validate()?.clone();

    match command {
        Command::Ping => {
            let pong = factory.connection().await?.ping().await?;
            println!(
                "InfluxDB {} responded in {} ms",
                pong.version,
                pong.response_time.as_millis()
            );
        }
        Command::Version => {
            println!("{}", factory.connection().await?.version().await?);
        }
        Command::Exists { name } => {
            let name = name.unwrap_or(properties.database);
            let exists = factory.connection().await?.database_exists(&name).await?;
            println!("{exists}");
        }
        Command::CreateDatabase { name } => {
            let name = name.unwrap_or(properties.database);
            factory
                .connection()
                .await?
                .query(&Query::create_database(&name))
                .await?;
            info!(database = %name, "Database created");
        }
        Command::DropDatabase { name } => {
            factory
                .connection()
                .await?
                .query(&Query::drop_database(&name))
                .await?;
            info!(database = %name, "Database dropped");
        }
        Command::Query {
            command,
            epoch,
            chunk_size,
        } => {
            let query = Query::new(command).with_database(&properties.database);
            let connection = factory.connection().await?;
            match (chunk_size, epoch) {
                (Some(size), _) => {
                    connection
                        .query_chunked(&query, size, |chunk| print_json(&chunk, false))
                        .await?
                }
                (None, Some(unit)) => {
                    print_json(&connection.query_with_unit(&query, unit).await?, true)
                }
                (None, None) => print_json(&connection.query(&query).await?, true),
            }
        }
        Command::Write {
            measurement,
            tags,
            fields,
            time,
        } => {
            let record = Record {
                measurement,
                tags: tags
                    .iter()
                    .map(|t| parse_pair(t))
                    .collect::<Result<_, _>>()
                    .map_err(InfluxError::invalid_configuration)?,
                fields: fields
                    .iter()
                    .map(|f| parse_pair(f).map(|(k, v)| (k, parse_field_value(&v))))
                    .collect::<Result<_, _>>()
                    .map_err(InfluxError::invalid_configuration)?,
                time,
            };
            let template = InfluxTemplate::new(factory, record_point).await?;
            template.write(&record).await?;
            info!(
                database = %properties.database,
                retention_policy = %properties.retention_policy,
                "Point written"
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse configuration from command line and environment
    let config = Config::parse();

    // Initialize logging
    init_tracing(&config);

    config.influx.validate()?;

    info!(
        url = %config.influx.url,
        database = %config.influx.database,
        "Starting influxdb-template v{}",
        env!("CARGO_PKG_VERSION")
    );

    let factory = ConnectionFactory::new(config.influx.clone());

    if let Err(e) = run(&factory, config.command).await {
        error!(error = %e, "Command failed");
        return Err(e.into());
    }

    Ok(())
}
