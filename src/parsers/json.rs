//! JSON document parser.

use crate::error::{ExecError, Result};
use crate::metrics::data::{FieldValue, Fields, Metric, Tags};
use crate::parsers::Parser;
use chrono::Utc;
use serde_json::{Map, Value};

/// Parses one JSON object into one metric.
///
/// Nested objects are flattened with `_` between key segments and every
/// numeric leaf becomes a float field. Top-level keys listed in `tag_keys` are
/// pulled out of the document first; string values among them become tags.
#[derive(Debug, Clone)]
pub struct JsonParser {
    metric_name: String,
    tag_keys: Vec<String>,
    default_tags: Tags,
}

impl JsonParser {
    pub fn new(metric_name: impl Into<String>, tag_keys: Vec<String>, default_tags: Tags) -> Self {
        Self {
            metric_name: metric_name.into(),
            tag_keys,
            default_tags,
        }
    }

    fn build(&self, mut document: Map<String, Value>) -> Result<Metric> {
        let mut tags = self.default_tags.clone();
        for key in &self.tag_keys {
            if let Some(Value::String(value)) = document.remove(key) {
                tags.insert(key.clone(), value);
            }
        }

        let mut fields = Fields::new();
        flatten("", &document, &mut fields);

        Metric::new(self.metric_name.as_str(), fields, tags, Utc::now())
    }
}

impl Parser for JsonParser {
    fn parse(&self, buf: &[u8]) -> Result<Vec<Metric>> {
        let value: Value = serde_json::from_slice(buf)
            .map_err(|e| ExecError::parse_error(format!("unable to parse JSON output: {}", e)))?;

        match value {
            Value::Object(document) => Ok(vec![self.build(document)?]),
            other => Err(ExecError::parse_error(format!(
                "JSON output must be an object, got {}",
                kind(&other)
            ))),
        }
    }

    fn parse_line(&self, line: &str) -> Result<Metric> {
        let mut metrics = self.parse(line.as_bytes())?;
        metrics
            .pop()
            .ok_or_else(|| ExecError::parse_error("no metric in line"))
    }
}

fn flatten(prefix: &str, object: &Map<String, Value>, fields: &mut Fields) {
    for (key, value) in object {
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}_{}", prefix, key)
        };

        match value {
            Value::Object(inner) => flatten(&name, inner, fields),
            Value::Number(number) => {
                if let Some(v) = number.as_f64() {
                    fields.insert(name, FieldValue::Float(v));
                }
            }
            // Strings, booleans, arrays and nulls carry no numeric value.
            _ => {}
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(tag_keys: &[&str]) -> JsonParser {
        JsonParser::new(
            "exec",
            tag_keys.iter().map(|k| k.to_string()).collect(),
            Tags::new(),
        )
    }

    #[test]
    fn test_single_field() {
        let metrics = parser(&[]).parse(br#"{"a":1}"#).unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name(), "exec");
        assert_eq!(metrics[0].field("a"), Some(&FieldValue::Float(1.0)));
        assert!(metrics[0].tags().is_empty());
    }

    #[test]
    fn test_nested_objects_flatten() {
        let metrics = parser(&[])
            .parse(br#"{"cpu":{"user":1.5,"sys":{"kernel":2}},"ignored":"text","flag":true,"list":[1,2]}"#)
            .unwrap();
        let metric = &metrics[0];
        assert_eq!(metric.fields().len(), 2);
        assert_eq!(metric.field("cpu_user"), Some(&FieldValue::Float(1.5)));
        assert_eq!(metric.field("cpu_sys_kernel"), Some(&FieldValue::Float(2.0)));
    }

    #[test]
    fn test_tag_keys_and_default_tags() {
        let mut defaults = Tags::new();
        defaults.insert("dc".to_string(), "east".to_string());
        defaults.insert("host".to_string(), "default".to_string());
        let parser = JsonParser::new("exec", vec!["host".to_string(), "port".to_string()], defaults);

        let metric = parser
            .parse_line(r#"{"host":"db1","port":5432,"load":0.7}"#)
            .unwrap();

        assert_eq!(metric.tag("host"), Some("db1"));
        assert_eq!(metric.tag("dc"), Some("east"));
        // A non-string tag key is removed but not turned into a tag.
        assert_eq!(metric.tag("port"), None);
        assert_eq!(metric.field("port"), None);
        assert_eq!(metric.field("load"), Some(&FieldValue::Float(0.7)));
    }

    #[test]
    fn test_invalid_documents() {
        let parser = parser(&[]);
        assert!(parser.parse(b"ok").unwrap_err().is_parse());
        assert!(parser.parse(b"[1,2]").unwrap_err().is_parse());
        assert!(parser.parse(b"").unwrap_err().is_parse());
        assert!(parser.parse(br#"{"only":"strings"}"#).unwrap_err().is_parse());
    }
}
