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

//! Live report source backed by the nvidia-smi binary

use crate::domain::SourceError;
use crate::ports::{CommandExecutor, ReportSource, SystemCommand};
use async_trait::async_trait;
use std::sync::Arc;

/// Default location of the nvidia-smi binary
pub const DEFAULT_NVIDIA_SMI_PATH: &str = "/usr/bin/nvidia-smi";

/// Arguments requesting the full query as XML
pub const NVIDIA_SMI_ARGS: &[&str] = &["-q", "-x"];

/// Runs `nvidia-smi -q -x` for every fetch
///
/// Time limits belong to the executor.
pub struct NvidiaSmiReportSource {
    executor: Arc<dyn CommandExecutor>,
    program: String,
}

impl NvidiaSmiReportSource {
    /// Create a new nvidia-smi source
    ///
    /// # Arguments
    /// * `executor` - Command executor used to run the binary
    /// * `program` - Path to nvidia-smi
    pub fn new(executor: Arc<dyn CommandExecutor>, program: &str) -> Self {
        Self {
            executor,
            program: program.to_string(),
        }
    }

    /// Path of the binary this source runs
    pub fn program(&self) -> &str {
        &self.program
    }

    fn command(&self) -> SystemCommand {
        SystemCommand::new(&self.program).args(NVIDIA_SMI_ARGS)
    }
}

#[async_trait]
impl ReportSource for NvidiaSmiReportSource {
    async fn fetch(&self) -> Result<String, SourceError> {
        let command = self.command();
        let output = self.executor.execute(&command).await?;

        if !output.success {
            return Err(SourceError::CommandFailed {
                command: command.display(),
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }

        Ok(output.stdout)
    }

    fn describe(&self) -> String {
        format!("{} {}", self.program, NVIDIA_SMI_ARGS.join(" "))
    }
}
