//! Data format registry.

use crate::error::{ExecError, Result};
use crate::parsers::{GraphiteParser, InfluxParser, JsonParser, Parser, ParserConfig};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds a parser for one data format from the shared options.
pub type ParserConstructor = fn(&ParserConfig) -> Result<Arc<dyn Parser>>;

lazy_static::lazy_static! {
    static ref BUILTIN: Arc<ParserRegistry> = Arc::new(ParserRegistry::default());
}

/// Table mapping data format names to parser constructors.
///
/// Building is a pure operation: no I/O and no shared mutable state, so
/// `build` may be called from any number of tasks at once.
#[derive(Clone)]
pub struct ParserRegistry {
    constructors: HashMap<String, ParserConstructor>,
}

impl ParserRegistry {
    /// A registry with no formats at all.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// The shared registry holding the built-in formats.
    pub fn builtin() -> Arc<ParserRegistry> {
        Arc::clone(&*BUILTIN)
    }

    /// Register a constructor, returning the one it replaced.
    pub fn register(
        &mut self,
        format: impl Into<String>,
        constructor: ParserConstructor,
    ) -> Option<ParserConstructor> {
        self.constructors.insert(format.into(), constructor)
    }

    pub fn supports(&self, format: &str) -> bool {
        self.constructors.contains_key(format)
    }

    /// Registered format names, sorted.
    pub fn formats(&self) -> Vec<&str> {
        let mut formats: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        formats.sort_unstable();
        formats
    }

    /// Build the parser for `config.data_format`.
    pub fn build(&self, config: &ParserConfig) -> Result<Arc<dyn Parser>> {
        let constructor = self.constructors.get(&config.data_format).ok_or_else(|| {
            ExecError::config_error(format!("Invalid data format: {}", config.data_format))
        })?;
        constructor(config)
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("json", build_json);
        registry.register("influx", build_influx);
        registry.register("graphite", build_graphite);
        registry
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}

/// Build a parser from the built-in registry.
pub fn new_parser(config: &ParserConfig) -> Result<Arc<dyn Parser>> {
    BUILTIN.build(config)
}

fn build_json(config: &ParserConfig) -> Result<Arc<dyn Parser>> {
    Ok(Arc::new(JsonParser::new(
        config.metric_name.clone(),
        config.tag_keys.clone(),
        config.default_tags.clone(),
    )))
}

fn build_influx(_config: &ParserConfig) -> Result<Arc<dyn Parser>> {
    Ok(Arc::new(InfluxParser::new()))
}

fn build_graphite(config: &ParserConfig) -> Result<Arc<dyn Parser>> {
    Ok(Arc::new(GraphiteParser::new(
        &config.separator,
        &config.templates,
        config.default_tags.clone(),
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::data::Metric;

    #[test]
    fn test_builtin_formats() {
        for format in ["json", "influx", "graphite"] {
            let config = ParserConfig::new(format).with_metric_name("exec");
            assert!(new_parser(&config).is_ok(), "{} should build", format);
        }
        assert_eq!(ParserRegistry::default().formats(), vec!["graphite", "influx", "json"]);
    }

    #[test]
    fn test_unknown_format_is_config_error() {
        let err = new_parser(&ParserConfig::new("xml")).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("Invalid data format: xml"));
    }

    #[test]
    fn test_graphite_rejects_bad_template() {
        let config = ParserConfig::new("graphite").with_templates(vec!["a.* measurement*.field".to_string()]);
        let err = new_parser(&config).unwrap_err();
        assert!(err.is_config());
    }

    #[derive(Debug)]
    struct NullParser;

    impl Parser for NullParser {
        fn parse(&self, _buf: &[u8]) -> Result<Vec<Metric>> {
            Ok(Vec::new())
        }

        fn parse_line(&self, line: &str) -> Result<Metric> {
            Err(ExecError::parse_error(format!("cannot parse '{}'", line)))
        }
    }

    #[test]
    fn test_register_custom_format() {
        let mut registry = ParserRegistry::default();
        assert!(!registry.supports("null"));

        let replaced = registry.register("null", |_| Ok(Arc::new(NullParser) as Arc<dyn Parser>));
        assert!(replaced.is_none());

        let parser = registry.build(&ParserConfig::new("null")).unwrap();
        assert!(parser.parse(b"anything").unwrap().is_empty());
        assert!(!ParserRegistry::builtin().supports("null"));
    }
}
