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

use std::path::PathBuf;
use thiserror::Error;

/// Command execution errors
#[derive(Debug, Clone, Error)]
pub enum CommandError {
    /// The program could not be found on the system
    #[error("Command not found: {0}")]
    NotFound(String),
    /// The program could not be spawned or its output not collected
    #[error("Command execution failed: {0}")]
    ExecutionFailed(String),
    /// The program did not finish within the configured timeout
    #[error("Command '{0}' timed out")]
    Timeout(String),
}

/// Errors raised while obtaining the raw diagnostics report
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The diagnostics tool ran but exited unsuccessfully
    #[error("Command '{command}' failed{}{}", exit_suffix(.exit_code), stderr_suffix(.stderr))]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    /// The diagnostics tool could not be run at all
    #[error(transparent)]
    Command(#[from] CommandError),
    /// The sample report could not be read
    #[error("Failed to read sample report {}: {message}", .path.display())]
    SampleUnreadable { path: PathBuf, message: String },
}

fn exit_suffix(exit_code: &Option<i32>) -> String {
    exit_code
        .map(|code| format!(" with exit code {code}"))
        .unwrap_or_default()
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Errors surfaced by the metrics export service
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    /// The diagnostics source failed; no report is available for this scrape
    #[error("Diagnostics source unavailable: {0}")]
    Source(#[from] SourceError),
}

/// Errors raised while assembling the exporter configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for this exporter
    #[error("Invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// The working directory needed to locate the sample report is unavailable
    #[error("Cannot resolve working directory: {0}")]
    WorkingDirectory(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = SourceError::CommandFailed {
            command: "/usr/bin/nvidia-smi".to_string(),
            exit_code: Some(9),
            stderr: "NVIDIA-SMI has failed\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Command '/usr/bin/nvidia-smi' failed with exit code 9: NVIDIA-SMI has failed"
        );

        let err = SourceError::CommandFailed {
            command: "nvidia-smi".to_string(),
            exit_code: None,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "Command 'nvidia-smi' failed");
    }

    #[test]
    fn test_export_error_wraps_source() {
        let err: ExportError = SourceError::from(CommandError::NotFound("nvidia-smi".into())).into();
        assert_eq!(
            err.to_string(),
            "Diagnostics source unavailable: Command not found: nvidia-smi"
        );
    }
}
