//! Graphite plaintext parser with path templates.
//!
//! Input lines look like `servers.web01.cpu.load 0.5 1700000000`. Templates
//! map the dot-separated nodes of the path onto a measurement name, a field
//! name and tags:
//!
//! ```text
//! [filter] template [tag=value,...]
//! servers.*  .host.measurement.field  dc=east
//! ```
//!
//! Recognised template nodes are `measurement`, `measurement*`, `field`,
//! `field*`, an empty node (skipped) or any other word, which becomes a tag.

use crate::error::{ExecError, Result};
use crate::metrics::data::{FieldValue, Fields, Metric, Tags};
use crate::parsers::{lines, Parser};
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashSet;

pub const DEFAULT_SEPARATOR: &str = ".";
const DEFAULT_TEMPLATE: &str = "measurement*";
const DEFAULT_FIELD: &str = "value";

#[derive(Debug, Clone)]
pub struct GraphiteParser {
    separator: String,
    templates: Vec<FilteredTemplate>,
    default_template: Template,
    default_tags: Tags,
}

#[derive(Debug, Clone)]
struct FilteredTemplate {
    filter: Vec<String>,
    template: Template,
}

#[derive(Debug, Clone)]
struct Template {
    nodes: Vec<String>,
    tags: Tags,
}

impl GraphiteParser {
    /// Build a parser, validating every template.
    ///
    /// An empty separator falls back to `"."`. A template without a filter
    /// replaces the built-in `measurement*` default.
    pub fn new(separator: &str, templates: &[String], default_tags: Tags) -> Result<Self> {
        let separator = if separator.is_empty() {
            DEFAULT_SEPARATOR.to_string()
        } else {
            separator.to_string()
        };

        let mut default_template = Template::parse(DEFAULT_TEMPLATE, None)?;
        let mut filtered = Vec::new();
        let mut seen_filters = HashSet::new();

        for raw in templates {
            let parts: Vec<&str> = raw.split_whitespace().collect();
            let (filter, template, tags) = match parts.as_slice() {
                [template] => (None, *template, None),
                [first, second] if second.contains('=') => (None, *first, Some(*second)),
                [filter, template] => (Some(*filter), *template, None),
                [filter, template, tags] => (Some(*filter), *template, Some(*tags)),
                _ => {
                    return Err(ExecError::config_error(format!(
                        "invalid graphite template '{}'",
                        raw
                    )))
                }
            };

            let template = Template::parse(template, tags)?;
            let filter = filter.unwrap_or_default();
            if !seen_filters.insert(filter.to_string()) {
                return Err(ExecError::config_error(format!(
                    "duplicate graphite template filter '{}'",
                    filter
                )));
            }

            if filter.is_empty() {
                default_template = template;
            } else {
                filtered.push(FilteredTemplate {
                    filter: filter.split('.').map(str::to_string).collect(),
                    template,
                });
            }
        }

        Ok(Self {
            separator,
            templates: filtered,
            default_template,
            default_tags,
        })
    }

    /// Most specific template whose filter matches `path`.
    fn template_for(&self, path: &[&str]) -> &Template {
        self.templates
            .iter()
            .filter(|t| matches_filter(&t.filter, path))
            .fold(None::<&FilteredTemplate>, |best, candidate| match best {
                Some(b) if b.filter.len() >= candidate.filter.len() => Some(b),
                _ => Some(candidate),
            })
            .map(|t| &t.template)
            .unwrap_or(&self.default_template)
    }

    fn apply(&self, path: &str) -> (String, String, Tags) {
        let nodes: Vec<&str> = path.split('.').collect();
        let template = self.template_for(&nodes);

        let mut measurement = Vec::new();
        let mut field = Vec::new();
        let mut path_tags = Tags::new();

        for (i, role) in template.nodes.iter().enumerate() {
            if i >= nodes.len() {
                break;
            }
            match role.as_str() {
                "measurement" => measurement.push(nodes[i]),
                "measurement*" => {
                    measurement.extend_from_slice(&nodes[i..]);
                    break;
                }
                "field" => field.push(nodes[i]),
                "field*" => {
                    field.extend_from_slice(&nodes[i..]);
                    break;
                }
                "" => {}
                tag => {
                    path_tags
                        .entry(tag.to_string())
                        .and_modify(|v| {
                            v.push_str(&self.separator);
                            v.push_str(nodes[i]);
                        })
                        .or_insert_with(|| nodes[i].to_string());
                }
            }
        }

        let measurement = if measurement.is_empty() {
            path.to_string()
        } else {
            measurement.join(&self.separator)
        };
        let field = if field.is_empty() {
            DEFAULT_FIELD.to_string()
        } else {
            field.join(&self.separator)
        };
        let mut tags = self.default_tags.clone();
        tags.extend(template.tags.clone());
        tags.extend(path_tags);
        (measurement, field, tags)
    }
}

impl Template {
    fn parse(template: &str, tags: Option<&str>) -> Result<Self> {
        let nodes: Vec<String> = template.split('.').map(str::to_string).collect();
        if template.is_empty() {
            return Err(ExecError::config_error("graphite template cannot be empty"));
        }
        if let Some(pos) = nodes.iter().position(|n| n.ends_with('*')) {
            if pos != nodes.len() - 1 || !matches!(nodes[pos].as_str(), "measurement*" | "field*") {
                return Err(ExecError::config_error(format!(
                    "invalid graphite template '{}': only a trailing measurement* or field* may be greedy",
                    template
                )));
            }
        }

        let mut parsed_tags = Tags::new();
        for pair in tags.into_iter().flat_map(|t| t.split(',')) {
            match pair.split_once('=') {
                Some((k, v)) if !k.is_empty() && !v.is_empty() => {
                    parsed_tags.insert(k.to_string(), v.to_string());
                }
                _ => {
                    return Err(ExecError::config_error(format!(
                        "invalid graphite template tags '{}'",
                        pair
                    )))
                }
            }
        }

        Ok(Self {
            nodes,
            tags: parsed_tags,
        })
    }
}

fn matches_filter(filter: &[String], path: &[&str]) -> bool {
    filter.len() <= path.len()
        && filter
            .iter()
            .zip(path)
            .all(|(f, node)| f == "*" || f == node)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let seconds = raw
        .parse::<f64>()
        .ok()
        .filter(|s| s.is_finite())
        .ok_or_else(|| ExecError::parse_error(format!("invalid timestamp '{}'", raw)))?;
    if seconds == -1.0 {
        return Ok(Utc::now());
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
    Utc.timestamp_opt(whole as i64, nanos)
        .single()
        .ok_or_else(|| ExecError::parse_error(format!("timestamp out of range '{}'", raw)))
}

impl Parser for GraphiteParser {
    fn parse(&self, buf: &[u8]) -> Result<Vec<Metric>> {
        lines(buf)?.map(|(_, line)| self.parse_line(line)).collect()
    }

    fn parse_line(&self, line: &str) -> Result<Metric> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let (path, raw_value, raw_timestamp) = match parts.as_slice() {
            [path, value] => (*path, *value, None),
            [path, value, ts] => (*path, *value, Some(*ts)),
            _ => {
                return Err(ExecError::parse_error(format!(
                    "received \"{}\" which doesn't have the required fields",
                    line
                )))
            }
        };

        let value = raw_value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                ExecError::parse_error(format!("field \"{}\" value: \"{}\" is not a number", path, raw_value))
            })?;

        let timestamp = match raw_timestamp {
            Some(raw) => parse_timestamp(raw)?,
            None => Utc::now(),
        };

        let (measurement, field, tags) = self.apply(path);
        let mut fields = Fields::new();
        fields.insert(field, FieldValue::Float(value));

        Metric::new(measurement, fields, tags, timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(templates: &[&str]) -> GraphiteParser {
        let templates: Vec<String> = templates.iter().map(|t| t.to_string()).collect();
        GraphiteParser::new(".", &templates, Tags::new()).unwrap()
    }

    #[test]
    fn test_default_template_uses_whole_path() {
        let metric = parser(&[]).parse_line("cpu.load.short 0.5 1700000000").unwrap();
        assert_eq!(metric.name(), "cpu.load.short");
        assert_eq!(metric.field("value"), Some(&FieldValue::Float(0.5)));
        assert_eq!(metric.timestamp().timestamp(), 1700000000);
    }

    #[test]
    fn test_template_with_tags_and_field() {
        let metric = parser(&["servers.* .host.measurement.field dc=east"])
            .parse_line("servers.web01.cpu.idle 93.5")
            .unwrap();
        assert_eq!(metric.name(), "cpu");
        assert_eq!(metric.tag("host"), Some("web01"));
        assert_eq!(metric.tag("dc"), Some("east"));
        assert_eq!(metric.field("idle"), Some(&FieldValue::Float(93.5)));
    }

    #[test]
    fn test_most_specific_filter_wins() {
        let parser = parser(&[
            "servers.* .host.measurement*",
            "servers.db.* .role.host.measurement*",
            "region.measurement*",
        ]);

        let specific = parser.parse_line("servers.db.pg1.conn.active 12").unwrap();
        assert_eq!(specific.tag("role"), Some("db"));
        assert_eq!(specific.tag("host"), Some("pg1"));
        assert_eq!(specific.name(), "conn.active");

        let general = parser.parse_line("servers.web01.mem.free 1").unwrap();
        assert_eq!(general.tag("host"), Some("web01"));
        assert_eq!(general.name(), "mem.free");

        let fallback = parser.parse_line("us.disk.used 3").unwrap();
        assert_eq!(fallback.tag("region"), Some("us"));
        assert_eq!(fallback.name(), "disk.used");
    }

    #[test]
    fn test_custom_separator() {
        let templates = vec!["measurement.measurement.field*".to_string()];
        let parser = GraphiteParser::new("_", &templates, Tags::new()).unwrap();
        let metric = parser.parse_line("cpu.total.usage.user 7").unwrap();
        assert_eq!(metric.name(), "cpu_total");
        assert!(metric.field("usage_user").is_some());
    }

    #[test]
    fn test_default_tags_lose_to_path_tags() {
        let mut defaults = Tags::new();
        defaults.insert("host".to_string(), "fallback".to_string());
        defaults.insert("env".to_string(), "prod".to_string());
        let templates = vec!["host.measurement".to_string()];
        let parser = GraphiteParser::new("", &templates, defaults).unwrap();

        let metric = parser.parse_line("web02.requests 40").unwrap();
        assert_eq!(metric.tag("host"), Some("web02"));
        assert_eq!(metric.tag("env"), Some("prod"));
    }

    #[test]
    fn test_invalid_templates() {
        let bad = |t: &[&str]| {
            let templates: Vec<String> = t.iter().map(|s| s.to_string()).collect();
            GraphiteParser::new(".", &templates, Tags::new()).unwrap_err()
        };
        assert!(bad(&["measurement*.field"]).is_config());
        assert!(bad(&["host*.measurement"]).is_config());
        assert!(bad(&["a.* measurement bad-tag"]).is_config());
        assert!(bad(&["a.* measurement", "a.* field"]).is_config());
        assert!(bad(&["a b c d"]).is_config());
    }

    #[test]
    fn test_invalid_lines() {
        let parser = parser(&[]);
        assert!(parser.parse_line("cpu.load").unwrap_err().is_parse());
        assert!(parser.parse_line("cpu.load abc").unwrap_err().is_parse());
        assert!(parser.parse_line("cpu.load 1 yesterday").unwrap_err().is_parse());
        assert!(parser.parse(b"cpu.load 1\nbroken\n").unwrap_err().is_parse());
    }

    #[test]
    fn test_fractional_timestamps() {
        let parser = parser(&[]);
        let positive = parser.parse_line("a.b 1 1700000000.25").unwrap();
        assert_eq!(positive.timestamp().timestamp_millis(), 1_700_000_000_250);

        let negative = parser.parse_line("a.b 1 -1.5").unwrap();
        assert_eq!(negative.timestamp().timestamp_millis(), -1500);
    }

    #[test]
    fn test_parse_buffer() {
        let metrics = parser(&[]).parse(b"a.b 1\n\nc.d 2 -1\n").unwrap();
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[1].name(), "c.d");
    }
}
