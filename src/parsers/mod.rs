//! Output parsers and the registry that builds them.
//!
//! A [`Parser`] turns the raw standard output of a command into metrics. The
//! concrete parser is picked by data format name through a
//! [`ParserRegistry`], so the collector never needs to know which formats
//! exist.

pub mod graphite;
pub mod influx;
pub mod json;
pub mod registry;

pub use graphite::GraphiteParser;
pub use influx::InfluxParser;
pub use json::JsonParser;
pub use registry::{new_parser, ParserConstructor, ParserRegistry};

use crate::error::Result;
use crate::metrics::data::{Metric, Tags};

/// Converts command output into metrics.
///
/// Both operations are pure functions of their input and the parser's fixed
/// configuration, so one instance can be shared by every task of a cycle.
pub trait Parser: Send + Sync + std::fmt::Debug {
    /// Parse a whole output buffer into zero or more metrics.
    fn parse(&self, buf: &[u8]) -> Result<Vec<Metric>>;

    /// Parse a single line into exactly one metric.
    fn parse_line(&self, line: &str) -> Result<Metric>;
}

/// Options covering every built-in data format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParserConfig {
    /// One of the registered format names, e.g. "json", "influx", "graphite"
    pub data_format: String,
    /// Only applies to graphite data
    pub separator: String,
    /// Only applies to graphite data
    pub templates: Vec<String>,
    /// Only applies to JSON data
    pub tag_keys: Vec<String>,
    /// Measurement name; only applies to JSON data
    pub metric_name: String,
    /// Tags added to every parsed metric
    pub default_tags: Tags,
}

impl ParserConfig {
    pub fn new(data_format: impl Into<String>) -> Self {
        Self {
            data_format: data_format.into(),
            ..Default::default()
        }
    }

    pub fn with_metric_name(mut self, name: impl Into<String>) -> Self {
        self.metric_name = name.into();
        self
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn with_templates(mut self, templates: Vec<String>) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_tag_keys(mut self, tag_keys: Vec<String>) -> Self {
        self.tag_keys = tag_keys;
        self
    }

    pub fn with_default_tags(mut self, default_tags: Tags) -> Self {
        self.default_tags = default_tags;
        self
    }
}

/// Split a buffer into the non-blank lines a line-oriented format consumes.
pub(crate) fn lines(buf: &[u8]) -> Result<impl Iterator<Item = (usize, &str)>> {
    let text = std::str::from_utf8(buf)
        .map_err(|e| crate::error::ExecError::parse_error(format!("output is not valid UTF-8: {}", e)))?;
    Ok(text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty()))
}
