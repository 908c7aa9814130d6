//! Error handling for the exec_gather crate.

use std::process::ExitStatus;

/// A specialized `Result` type for exec_gather operations.
pub type Result<T> = std::result::Result<T, ExecError>;

/// The main error type for command collection.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// Invalid or missing data format, or options the parser rejected
    #[error("exec configuration error: {0}")]
    Config(String),

    /// A command could not be started or exited unsuccessfully
    #[error("exec: {cause} for command '{command}'")]
    Execution {
        command: String,
        #[source]
        cause: ExecutionCause,
    },

    /// Command output did not conform to the configured data format
    #[error("parse error: {0}")]
    Parse(String),

    /// A collection task panicked or was cancelled
    #[error("collection task failed: {0}")]
    Task(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),
}

/// Why a single command failed to produce output.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionCause {
    #[error("unable to parse command, {0}")]
    Split(String),

    #[error("unable to parse command, empty command line")]
    Empty,

    #[error("{0}")]
    Spawn(#[from] std::io::Error),

    #[error("{0}")]
    Exit(ExitStatus),
}

impl ExecError {
    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new execution error for `command`
    pub fn execution(command: impl Into<String>, cause: ExecutionCause) -> Self {
        Self::Execution {
            command: command.into(),
            cause,
        }
    }

    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new task error
    pub fn task_error(msg: impl Into<String>) -> Self {
        Self::Task(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_message_names_command() {
        let err = ExecError::execution("/usr/bin/mycollector --foo", ExecutionCause::Empty);
        let message = err.to_string();
        assert!(message.contains("'/usr/bin/mycollector --foo'"));
        assert!(message.contains("empty command line"));
        assert!(err.is_execution());
    }

    #[test]
    fn test_config_message() {
        let err = ExecError::config_error("Invalid data format: xml");
        assert_eq!(err.to_string(), "exec configuration error: Invalid data format: xml");
        assert!(err.is_config());
        assert!(!err.is_parse());
    }
}
