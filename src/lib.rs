//! InfluxDB Template Library
//!
//! This library wires an InfluxDB 1.x client to application models: a
//! [`ConnectionFactory`] builds and caches one client from [`InfluxProperties`],
//! and an [`InfluxTemplate<T>`] writes and queries `T` through a [`Converter`].

pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use client::{HttpClient, InfluxClient};
pub use config::InfluxProperties;
pub use db::{ConnectionFactory, Converter, InfluxTemplate, TemplateBuilder};
pub use error::{ClientError, InfluxError};
pub use models::{BatchPoints, ConsistencyLevel, Point, Query, QueryResult, TimeUnit};
