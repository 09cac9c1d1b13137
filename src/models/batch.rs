//! Batched writes.

use crate::models::{Point, TimeUnit};
use serde::{Deserialize, Serialize};

/// How many replicas must acknowledge a write before the server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsistencyLevel {
    All,
    Any,
    One,
    Quorum,
}

impl ConsistencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
            Self::One => "one",
            Self::Quorum => "quorum",
        }
    }
}

impl std::fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A set of points sent in one write request.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPoints {
    database: String,
    retention_policy: Option<String>,
    consistency: Option<ConsistencyLevel>,
    precision: TimeUnit,
    points: Vec<Point>,
}

impl BatchPoints {
    /// Start building a batch for `database`.
    pub fn database(database: impl Into<String>) -> BatchPointsBuilder {
        BatchPointsBuilder {
            batch: BatchPoints {
                database: database.into(),
                retention_policy: None,
                consistency: None,
                precision: TimeUnit::Nanoseconds,
                points: Vec::new(),
            },
        }
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub fn retention_policy(&self) -> Option<&str> {
        self.retention_policy.as_deref()
    }

    pub fn consistency(&self) -> Option<ConsistencyLevel> {
        self.consistency
    }

    pub fn precision(&self) -> TimeUnit {
        self.precision
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Append a point to the batch.
    pub fn point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Newline-separated line protocol, every timestamp converted to the batch precision.
    pub fn line_protocol(&self) -> String {
        self.points
            .iter()
            .map(|p| p.line_protocol_with_precision(self.precision))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Builder returned by [`BatchPoints::database`].
#[derive(Debug, Clone)]
pub struct BatchPointsBuilder {
    batch: BatchPoints,
}

impl BatchPointsBuilder {
    pub fn retention_policy(mut self, retention_policy: impl Into<String>) -> Self {
        self.batch.retention_policy = Some(retention_policy.into());
        self
    }

    pub fn consistency(mut self, consistency: ConsistencyLevel) -> Self {
        self.batch.consistency = Some(consistency);
        self
    }

    pub fn precision(mut self, precision: TimeUnit) -> Self {
        self.batch.precision = precision;
        self
    }

    pub fn point(mut self, point: Point) -> Self {
        self.batch.points.push(point);
        self
    }

    pub fn points(mut self, points: impl IntoIterator<Item = Point>) -> Self {
        self.batch.points.extend(points);
        self
    }

    pub fn build(self) -> BatchPoints {
        self.batch
    }
}
