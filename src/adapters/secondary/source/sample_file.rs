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

//! Dry-run report source reading a captured nvidia-smi report from disk

use crate::domain::SourceError;
use crate::ports::ReportSource;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// File name looked up in the working directory when test mode is enabled
pub const SAMPLE_FILE_NAME: &str = "nvidia-smi.sample.xml";

/// Reads a fixed XML file instead of invoking nvidia-smi
pub struct SampleFileReportSource {
    path: PathBuf,
}

impl SampleFileReportSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ReportSource for SampleFileReportSource {
    async fn fetch(&self) -> Result<String, SourceError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| SourceError::SampleUnreadable {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn describe(&self) -> String {
        format!("sample file {}", self.path.display())
    }
}
