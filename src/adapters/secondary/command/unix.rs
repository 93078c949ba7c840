/*
Copyright 2024 San Francisco Compute Company

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Unix command execution adapter

use crate::domain::CommandError;
use crate::ports::{CommandExecutor, CommandOutput, SystemCommand};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// Unix-based command executor with optional timeouts
///
/// Commands are run exactly once. A failed run is reported to the caller,
/// which decides what to do with it.
pub struct UnixCommandExecutor {
    /// Timeout for commands that do not set their own
    default_timeout: Option<Duration>,
}

impl UnixCommandExecutor {
    /// Create a new Unix command executor
    ///
    /// # Arguments
    /// * `default_timeout` - Timeout applied when a command has none, `None` to wait indefinitely
    pub fn new(default_timeout: Option<Duration>) -> Self {
        Self { default_timeout }
    }

    /// Create a Unix command executor with default settings (no timeout)
    pub fn with_defaults() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl CommandExecutor for UnixCommandExecutor {
    async fn execute(&self, command: &SystemCommand) -> Result<CommandOutput, CommandError> {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null())
            .kill_on_drop(true);

        log::debug!("Executing: {}", command.display());

        let output = match command.timeout.or(self.default_timeout) {
            Some(limit) => timeout(limit, cmd.output())
                .await
                .map_err(|_| CommandError::Timeout(command.display()))?,
            None => cmd.output().await,
        };

        let output = output.map_err(|e| match e.kind() {
            ErrorKind::NotFound => CommandError::NotFound(command.program.clone()),
            _ => CommandError::ExecutionFailed(format!(
                "Failed to execute command '{}': {}",
                command.program, e
            )),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let success = output.status.success();
        let exit_code = output.status.code();

        if !success {
            log::debug!("Command failed with exit code: {exit_code:?}");
        }

        Ok(CommandOutput {
            stdout,
            stderr,
            exit_code,
            success,
        })
    }

    async fn is_command_available(&self, command_name: &str) -> Result<bool, CommandError> {
        if command_name.contains('/') {
            return Ok(tokio::fs::metadata(Path::new(command_name))
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false));
        }

        let which_cmd = SystemCommand::new("which")
            .args(&[command_name])
            .timeout(Duration::from_secs(5));

        match self.execute(&which_cmd).await {
            Ok(output) => Ok(output.success && !output.stdout.trim().is_empty()),
            Err(_) => Ok(false), // If 'which' fails, assume command is not available
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_unix_command_executor_basic() {
        let executor = UnixCommandExecutor::with_defaults();

        let cmd = SystemCommand::new("echo").args(&["hello", "world"]);

        let result = executor.execute(&cmd).await.unwrap();
        assert!(result.success);
        assert_eq!(result.stdout.trim(), "hello world");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_not_an_error() {
        let executor = UnixCommandExecutor::with_defaults();

        let result = executor.execute(&SystemCommand::new("false")).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(1));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let executor = UnixCommandExecutor::with_defaults();

        let cmd = SystemCommand::new("/definitely/not/a/real/command_12345");
        let result = executor.execute(&cmd).await;
        assert!(matches!(result, Err(CommandError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_command_timeout() {
        let executor = UnixCommandExecutor::with_defaults();

        let cmd = SystemCommand::new("sleep")
            .args(&["10"])
            .timeout(Duration::from_millis(100));

        let result = executor.execute(&cmd).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_default_timeout_applies() {
        let executor = UnixCommandExecutor::new(Some(Duration::from_millis(100)));

        let cmd = SystemCommand::new("sleep").args(&["10"]);
        let result = executor.execute(&cmd).await;
        assert!(matches!(result, Err(CommandError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_command_availability_check() {
        let executor = UnixCommandExecutor::with_defaults();

        assert!(!executor
            .is_command_available("definitely_not_a_real_command_12345")
            .await
            .unwrap());
        assert!(!executor
            .is_command_available("/definitely/not/a/real/command_12345")
            .await
            .unwrap());
    }
}
