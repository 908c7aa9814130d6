//! Running external commands and capturing their output.

use crate::error::{ExecError, ExecutionCause, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Executes a command line and returns what it wrote to standard output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command_line: &str) -> Result<Vec<u8>>;
}

/// Runs commands as real child processes.
///
/// The command line is split with shell-style quoting but no shell is
/// involved: pipes, globs and variables are passed through literally.
/// Standard error is discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

/// Split a command line into program and arguments.
pub fn split_command(command_line: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(command_line).map_err(|e| {
        ExecError::execution(command_line, ExecutionCause::Split(e.to_string()))
    })?;
    if argv.is_empty() {
        return Err(ExecError::execution(command_line, ExecutionCause::Empty));
    }
    Ok(argv)
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command_line: &str) -> Result<Vec<u8>> {
        let argv = split_command(command_line)?;
        debug!("Running command: {:?}", argv);

        let output = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| ExecError::execution(command_line, ExecutionCause::Spawn(e)))?;

        if !output.status.success() {
            return Err(ExecError::execution(
                command_line,
                ExecutionCause::Exit(output.status),
            ));
        }

        debug!("Command '{}' wrote {} bytes", command_line, output.stdout.len());
        Ok(output.stdout)
    }
}
