//! Insertable data points and their line protocol encoding.
//!
//! A [`Point`] is one row for a measurement: a sorted tag set, a sorted field
//! set and an optional timestamp. Points are built with [`Point::measurement`]
//! and encoded with [`Point::to_line_protocol`].

use crate::error::{ClientError, ClientResult};
use crate::models::TimeUnit;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// A field value. The variant decides the line protocol type suffix.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    /// Encoded with an `i` suffix
    Integer(i64),
    /// A `u64` above `i64::MAX`. 1.x servers have no unsigned field type, so
    /// [`Point::validate`] rejects it.
    UnsignedInteger(u64),
    Boolean(bool),
    String(String),
}

impl FieldValue {
    fn write_to(&self, out: &mut String) {
        // Writing into a String cannot fail.
        let _ = match self {
            Self::Float(v) => write!(out, "{v}"),
            Self::Integer(v) => write!(out, "{v}i"),
            Self::UnsignedInteger(v) => write!(out, "{v}u"),
            Self::Boolean(v) => write!(out, "{v}"),
            Self::String(v) => {
                out.push('"');
                for c in v.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
                Ok(())
            }
        };
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Self::UnsignedInteger(v), Self::Integer)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

/// One insertable record.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    time: Option<i64>,
    precision: TimeUnit,
}

impl Point {
    /// Start building a point for `measurement`.
    pub fn measurement(measurement: impl Into<String>) -> PointBuilder {
        PointBuilder {
            point: Point {
                measurement: measurement.into(),
                tags: BTreeMap::new(),
                fields: BTreeMap::new(),
                time: None,
                precision: TimeUnit::Nanoseconds,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.measurement
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Timestamp in [`Point::precision`] units, `None` to let the server assign one.
    pub fn time(&self) -> Option<i64> {
        self.time
    }

    pub fn precision(&self) -> TimeUnit {
        self.precision
    }

    /// Encode as a line protocol line using the point's own precision.
    pub fn to_line_protocol(&self) -> String {
        self.line_protocol_with_precision(self.precision)
    }

    /// Encode as a line protocol line, converting the timestamp to `precision`.
    pub fn line_protocol_with_precision(&self, precision: TimeUnit) -> String {
        let mut line = String::with_capacity(64);
        escape_into(&mut line, &self.measurement, &[',', ' ']);

        // Empty tag values are not representable in line protocol.
        for (key, value) in self.tags.iter().filter(|(_, v)| !v.is_empty()) {
            line.push(',');
            escape_into(&mut line, key, &[',', '=', ' ']);
            line.push('=');
            escape_into(&mut line, value, &[',', '=', ' ']);
        }

        line.push(' ');
        for (i, (key, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                line.push(',');
            }
            escape_into(&mut line, key, &[',', '=', ' ']);
            line.push('=');
            value.write_to(&mut line);
        }

        if let Some(time) = self.time {
            let _ = write!(line, " {}", precision.convert(time, self.precision));
        }
        line
    }

    /// Check that the point can be written.
    pub fn validate(&self) -> ClientResult<()> {
        if self.measurement.is_empty() {
            return Err(ClientError::invalid_point("measurement name must not be empty"));
        }
        if self.fields.is_empty() {
            return Err(ClientError::invalid_point(format!(
                "point for '{}' has no fields",
                self.measurement
            )));
        }
        // Line breaks end a line protocol entry and cannot be escaped.
        let names = std::iter::once(self.measurement.as_str())
            .chain(self.tags.iter().flat_map(|(k, v)| [k.as_str(), v.as_str()]))
            .chain(self.fields.keys().map(String::as_str));
        for name in names {
            if name.contains(['\n', '\r']) {
                return Err(ClientError::invalid_point(format!(
                    "'{}' contains a line break: {name:?}",
                    self.measurement.escape_debug()
                )));
            }
        }
        for (key, value) in &self.fields {
            match value {
                FieldValue::Float(v) if !v.is_finite() => {
                    return Err(ClientError::invalid_point(format!(
                        "field '{key}' of '{}' is not a finite number",
                        self.measurement
                    )));
                }
                FieldValue::UnsignedInteger(v) => {
                    return Err(ClientError::invalid_point(format!(
                        "field '{key}' of '{}' exceeds the signed integer range: {v}",
                        self.measurement
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}

fn escape_into(out: &mut String, value: &str, special: &[char]) {
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}

/// Builder returned by [`Point::measurement`].
#[derive(Debug, Clone)]
pub struct PointBuilder {
    point: Point,
}

impl PointBuilder {
    /// Add a tag; a later value for the same key wins.
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.point.tags.insert(key.into(), value.into());
        self
    }

    pub fn tags<K, V>(mut self, tags: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.point
            .tags
            .extend(tags.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Add a field; a later value for the same key wins.
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.point.fields.insert(key.into(), value.into());
        self
    }

    pub fn fields<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.point
            .fields
            .extend(fields.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set the timestamp and the unit it is expressed in.
    pub fn time(mut self, time: i64, unit: TimeUnit) -> Self {
        self.point.time = Some(time);
        self.point.precision = unit;
        self
    }

    /// Set the timestamp from a UTC datetime at nanosecond precision.
    ///
    /// Datetimes outside the range representable in i64 nanoseconds fall back
    /// to microseconds.
    pub fn timestamp(self, at: DateTime<Utc>) -> Self {
        match at.timestamp_nanos_opt() {
            Some(nanos) => self.time(nanos, TimeUnit::Nanoseconds),
            None => self.time(at.timestamp_micros(), TimeUnit::Microseconds),
        }
    }

    pub fn build(self) -> Point {
        self.point
    }
}
