//! Data structures for collected metrics.

use crate::error::{ExecError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field set of a metric, keyed by field name.
pub type Fields = BTreeMap<String, FieldValue>;

/// Tag set of a metric, keyed by tag name.
pub type Tags = BTreeMap<String, String>;

/// A scalar metric field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl FieldValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

/// A single measurement produced by a parser.
///
/// Metrics are immutable once built: the constructor enforces a non-empty
/// name and at least one field, and only read accessors are exposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    name: String,
    fields: Fields,
    tags: Tags,
    timestamp: DateTime<Utc>,
}

impl Metric {
    /// Build a metric, rejecting an empty name or an empty field set.
    pub fn new(
        name: impl Into<String>,
        fields: Fields,
        tags: Tags,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ExecError::parse_error("metric name cannot be empty"));
        }
        if fields.is_empty() {
            return Err(ExecError::parse_error(format!(
                "metric '{}' cannot be made without any fields",
                name
            )));
        }

        Ok(Self {
            name,
            fields,
            tags,
            timestamp,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Look up a single field by key.
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Look up a single tag by key.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Renders the metric as one influx line-protocol line.
impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", escape(&self.name, &[',', ' ']))?;
        for (key, value) in &self.tags {
            write!(
                f,
                ",{}={}",
                escape(key, &[',', ' ', '=']),
                escape(value, &[',', ' ', '='])
            )?;
        }

        let mut separator = ' ';
        for (key, value) in &self.fields {
            write!(f, "{}{}=", separator, escape(key, &[',', ' ', '=']))?;
            match value {
                FieldValue::Float(v) => write!(f, "{}", v)?,
                FieldValue::Integer(v) => write!(f, "{}i", v)?,
                FieldValue::Boolean(v) => write!(f, "{}", v)?,
                FieldValue::String(v) => write!(f, "\"{}\"", escape(v, &['"', '\\']))?,
            }
            separator = ',';
        }

        match self.timestamp.timestamp_nanos_opt() {
            Some(nanos) => write!(f, " {}", nanos),
            None => Ok(()),
        }
    }
}

fn escape(raw: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Outcome of one collection cycle, as exposed by the stream and web API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleReport {
    /// When the cycle started (Unix timestamp in milliseconds)
    pub timestamp: u64,
    /// Wall-clock duration of the cycle in milliseconds
    pub duration_ms: u64,
    /// Number of commands run
    pub commands: usize,
    /// Metrics accepted by the sink during the cycle
    pub metrics: Vec<Metric>,
    /// The error returned by the cycle, if any
    pub error: Option<String>,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
