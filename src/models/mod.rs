//! Data models for the InfluxDB template.
//!
//! This module re-exports all model types used throughout the crate.

pub mod batch;
pub mod ping;
pub mod point;
pub mod precision;
pub mod query;

// Re-export commonly used types
pub use batch::{BatchPoints, BatchPointsBuilder, ConsistencyLevel};
pub use ping::Pong;
pub use point::{FieldValue, Point, PointBuilder};
pub use precision::TimeUnit;
pub use query::{Query, QueryResult, Series, StatementResult, quote_identifier};
