//! Influx line-protocol parser.
//!
//! Each line has the shape
//! `measurement[,tag=value...] field=value[,field=value...] [timestamp]`
//! where the timestamp is in nanoseconds since the Unix epoch. Commas, spaces
//! and equals signs are escaped with a backslash; string field values are
//! double-quoted, integers carry an `i` suffix.

use crate::error::{ExecError, Result};
use crate::metrics::data::{FieldValue, Fields, Metric, Tags};
use crate::parsers::{lines, Parser};
use chrono::{TimeZone, Utc};

#[derive(Debug, Clone, Default)]
pub struct InfluxParser;

impl InfluxParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for InfluxParser {
    fn parse(&self, buf: &[u8]) -> Result<Vec<Metric>> {
        let mut metrics = Vec::new();
        for (number, line) in lines(buf)? {
            if line.starts_with('#') {
                continue;
            }
            let metric = parse_point(line).map_err(|err| match err {
                ExecError::Parse(msg) => ExecError::parse_error(format!("line {}: {}", number, msg)),
                other => other,
            })?;
            metrics.push(metric);
        }
        Ok(metrics)
    }

    fn parse_line(&self, line: &str) -> Result<Metric> {
        parse_point(line.trim())
    }
}

fn parse_point(line: &str) -> Result<Metric> {
    // Quotes only delimit string field values; the series section may hold
    // literal double quotes.
    let series = split_unescaped(line, ' ', false)
        .into_iter()
        .next()
        .unwrap_or_default();
    let sections: Vec<&str> = split_unescaped(&line[series.len()..], ' ', true)
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    let (field_set, timestamp) = match sections.as_slice() {
        [fields] => (*fields, None),
        [fields, ts] => (*fields, Some(*ts)),
        _ => {
            return Err(ExecError::parse_error(format!(
                "expected measurement, fields and optional timestamp in '{}'",
                line
            )))
        }
    };

    let mut series_parts = split_unescaped(series, ',', false).into_iter();
    let measurement = unescape(series_parts.next().unwrap_or_default());
    if measurement.is_empty() {
        return Err(ExecError::parse_error(format!("missing measurement in '{}'", line)));
    }

    let mut tags = Tags::new();
    for part in series_parts {
        let (key, value) = split_key_value(part)
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .ok_or_else(|| ExecError::parse_error(format!("invalid tag '{}'", part)))?;
        tags.insert(unescape(key), unescape(value));
    }

    let mut fields = Fields::new();
    for part in split_unescaped(field_set, ',', true) {
        let (key, raw) = split_key_value(part)
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .ok_or_else(|| ExecError::parse_error(format!("invalid field '{}'", part)))?;
        fields.insert(unescape(key), parse_field_value(raw)?);
    }

    let timestamp = match timestamp {
        Some(raw) => {
            let nanos = raw
                .parse::<i64>()
                .map_err(|_| ExecError::parse_error(format!("invalid timestamp '{}'", raw)))?;
            Utc.timestamp_nanos(nanos)
        }
        None => Utc::now(),
    };

    Metric::new(measurement, fields, tags, timestamp)
}

fn parse_field_value(raw: &str) -> Result<FieldValue> {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Ok(FieldValue::String(unescape(&raw[1..raw.len() - 1])));
    }
    if let Some(digits) = raw.strip_suffix('i') {
        return digits
            .parse::<i64>()
            .map(FieldValue::Integer)
            .map_err(|_| ExecError::parse_error(format!("invalid integer value '{}'", raw)));
    }
    match raw {
        "t" | "T" | "true" | "True" | "TRUE" => Ok(FieldValue::Boolean(true)),
        "f" | "F" | "false" | "False" | "FALSE" => Ok(FieldValue::Boolean(false)),
        _ => match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(FieldValue::Float(v)),
            _ => Err(ExecError::parse_error(format!("invalid field value '{}'", raw))),
        },
    }
}

/// Split on `delim`, skipping backslash-escaped characters and, when
/// `quotes` is set, anything between double quotes.
fn split_unescaped(s: &str, delim: char, quotes: bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    let mut in_quotes = false;

    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' if quotes => in_quotes = !in_quotes,
            c if c == delim && !in_quotes => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn split_key_value(s: &str) -> Option<(&str, &str)> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' {
            return Some((&s[..i], &s[i + 1..]));
        }
    }
    None
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}
