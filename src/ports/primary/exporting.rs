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

use crate::domain::{ExportError, RunReport};
use async_trait::async_trait;

/// Primary port - Main interface offered by the exporter domain
///
/// This is what external systems (the HTTP scrape endpoint, library consumers)
/// use to obtain metrics. Every call runs the full pipeline against a fresh
/// diagnostics report; nothing is cached between calls.
#[async_trait]
pub trait MetricsExportService: Send + Sync {
    /// Fetch and parse a fresh diagnostics report
    ///
    /// # Returns
    /// * `Ok(RunReport)` - Parsed report, possibly partial if the XML was malformed
    /// * `Err(ExportError)` - The diagnostics source could not be read
    async fn collect_report(&self) -> Result<RunReport, ExportError>;

    /// Fetch a fresh report and render it as metric lines
    ///
    /// # Returns
    /// * `Ok(String)` - Newline-terminated metric lines
    /// * `Err(ExportError)` - The diagnostics source could not be read
    async fn render_metrics(&self) -> Result<String, ExportError>;

    /// Human-readable description of where reports come from
    fn source_description(&self) -> String;
}
