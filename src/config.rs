//! Exec input configuration.

use crate::error::{ExecError, Result};
use crate::metrics::data::Tags;
use crate::parsers::ParserConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Example configuration, in the format [`ExecConfig::load`] reads.
pub const SAMPLE_CONFIG: &str = r#"
## Commands array
commands = ["/tmp/test.sh", "/usr/bin/mycollector --foo=bar"]

## measurement name suffix (for separating different commands)
name_suffix = "_mycollector"

## Data format to consume. This can be "json", "influx" or "graphite".
## Each data format has its own set of options:
##   json:     tag_keys, metric_name
##   graphite: separator, templates
data_format = "json"

## Collection interval used by `serve`, in milliseconds
interval_ms = 10000

[default_tags]
source = "exec"
"#;

/// Configuration for the exec collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecConfig {
    /// Command lines to run on every cycle
    pub commands: Vec<String>,
    /// Legacy single command, used only when `commands` is empty
    pub command: Option<String>,
    /// Data format of the command output ("json" when unset)
    pub data_format: String,
    /// Graphite separator
    pub separator: String,
    /// Graphite templates
    pub templates: Vec<String>,
    /// JSON keys promoted to tags
    pub tag_keys: Vec<String>,
    /// Measurement name for JSON output
    pub metric_name: String,
    /// Suffix appended to every metric name
    pub name_suffix: String,
    /// Tags added to every parsed metric
    pub default_tags: Tags,
    /// Collection interval in milliseconds
    pub interval_ms: u64,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            commands: Vec::new(),
            command: None,
            data_format: String::new(),
            separator: String::new(),
            templates: Vec::new(),
            tag_keys: Vec::new(),
            metric_name: crate::DEFAULT_METRIC_NAME.to_string(),
            name_suffix: String::new(),
            default_tags: Tags::new(),
            interval_ms: crate::DEFAULT_INTERVAL_MS,
        }
    }
}

impl ExecConfig {
    /// Create a configuration running the given commands.
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Load a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse a TOML configuration document.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ExecError::config_error(format!("Invalid configuration: {}", e)))
    }

    /// Apply the legacy-command and default-format rules.
    ///
    /// Idempotent; the collector calls it once when it is constructed.
    pub fn normalized(mut self) -> Self {
        if self.commands.is_empty() {
            if let Some(command) = self.command.take().filter(|c| !c.is_empty()) {
                self.commands = vec![command];
            }
        }
        if self.data_format.is_empty() {
            self.data_format = crate::DEFAULT_DATA_FORMAT.to_string();
        }
        if self.metric_name.is_empty() {
            self.metric_name = crate::DEFAULT_METRIC_NAME.to_string();
        }
        self
    }

    /// Parser options derived from this configuration.
    pub fn parser_config(&self) -> ParserConfig {
        ParserConfig::new(self.data_format.clone())
            .with_metric_name(self.metric_name.clone())
            .with_separator(self.separator.clone())
            .with_templates(self.templates.clone())
            .with_tag_keys(self.tag_keys.clone())
            .with_default_tags(self.default_tags.clone())
    }

    /// Set the commands to run.
    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands = commands.into_iter().map(Into::into).collect();
        self
    }

    /// Set the legacy single command.
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Set the data format.
    pub fn with_data_format(mut self, data_format: impl Into<String>) -> Self {
        self.data_format = data_format.into();
        self
    }

    /// Set the graphite separator.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Set the graphite templates.
    pub fn with_templates(mut self, templates: Vec<String>) -> Self {
        self.templates = templates;
        self
    }

    /// Set the JSON tag keys.
    pub fn with_tag_keys(mut self, tag_keys: Vec<String>) -> Self {
        self.tag_keys = tag_keys;
        self
    }

    /// Set the JSON measurement name.
    pub fn with_metric_name(mut self, metric_name: impl Into<String>) -> Self {
        self.metric_name = metric_name.into();
        self
    }

    /// Set the metric name suffix.
    pub fn with_name_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.name_suffix = suffix.into();
        self
    }

    /// Add a default tag.
    pub fn with_default_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_tags.insert(key.into(), value.into());
        self
    }

    /// Set the collection interval.
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_command_normalized() {
        let config = ExecConfig::default().with_command("/tmp/test.sh").normalized();
        assert_eq!(config.commands, vec!["/tmp/test.sh"]);
        assert_eq!(config.command, None);
    }

    #[test]
    fn test_commands_win_over_legacy_command() {
        let config = ExecConfig::new(["a", "b"]).with_command("c").normalized();
        assert_eq!(config.commands, vec!["a", "b"]);
    }

    #[test]
    fn test_default_format_is_json() {
        let config = ExecConfig::default().normalized();
        assert_eq!(config.data_format, "json");
        assert_eq!(config.metric_name, "exec");

        let config = ExecConfig::default().with_data_format("influx").normalized();
        assert_eq!(config.data_format, "influx");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let once = ExecConfig::default().with_command("x").normalized();
        assert_eq!(once.clone().normalized(), once);
    }

    #[test]
    fn test_sample_config_parses() {
        let config = ExecConfig::from_toml(SAMPLE_CONFIG).unwrap();
        assert_eq!(config.commands.len(), 2);
        assert_eq!(config.name_suffix, "_mycollector");
        assert_eq!(config.data_format, "json");
        assert_eq!(config.interval_ms, 10000);
        assert_eq!(config.default_tags.get("source").map(String::as_str), Some("exec"));
    }

    #[test]
    fn test_parser_config_carries_options() {
        let parser_config = ExecConfig::default()
            .with_data_format("graphite")
            .with_separator("_")
            .with_templates(vec!["host.measurement*".to_string()])
            .with_default_tag("dc", "east")
            .normalized()
            .parser_config();

        assert_eq!(parser_config.data_format, "graphite");
        assert_eq!(parser_config.separator, "_");
        assert_eq!(parser_config.metric_name, "exec");
        assert_eq!(parser_config.templates, vec!["host.measurement*"]);
        assert_eq!(parser_config.default_tags.len(), 1);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ExecConfig::from_toml("commands = 3").unwrap_err();
        assert!(err.is_config());
    }
}
