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

use crate::domain::SourceError;
use async_trait::async_trait;

/// Secondary port - Raw diagnostics report provider
///
/// Implementations return the unparsed XML document. The live adapter runs
/// nvidia-smi; the sample adapter reads a file for dry runs.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// Obtain the raw report text
    ///
    /// # Returns
    /// * `Ok(String)` - Raw XML as produced by `nvidia-smi -q -x`
    /// * `Err(SourceError)` - The report could not be obtained
    async fn fetch(&self) -> Result<String, SourceError>;

    /// Human-readable description used in startup logs
    fn describe(&self) -> String;
}
