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

use crate::domain::{format_report, parse_nvidia_smi_xml, ExportError, RunReport};
use crate::ports::{MetricsExportService, ReportSource};
use async_trait::async_trait;
use std::sync::Arc;

/// Domain service that turns diagnostics reports into metric text
///
/// Each call fetches a fresh raw report from the injected source, parses it
/// and formats it. The service holds no per-request state, so concurrent
/// scrapes run independently.
pub struct MetricsCollectionService {
    /// Raw report provider (live nvidia-smi or sample file)
    source: Arc<dyn ReportSource>,
}

impl MetricsCollectionService {
    /// Create a new metrics collection service
    ///
    /// # Arguments
    /// * `source` - Provider of raw nvidia-smi XML
    pub fn new(source: Arc<dyn ReportSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl MetricsExportService for MetricsCollectionService {
    async fn collect_report(&self) -> Result<RunReport, ExportError> {
        let raw = self.source.fetch().await?;
        let report = parse_nvidia_smi_xml(&raw);

        let attached = report.attached_gpus.trim();
        if !attached.is_empty() && attached != report.devices.len().to_string() {
            log::debug!(
                "nvidia-smi reports {} attached GPUs but listed {}",
                attached,
                report.devices.len()
            );
        }

        Ok(report)
    }

    async fn render_metrics(&self) -> Result<String, ExportError> {
        let report = self.collect_report().await?;
        Ok(format_report(&report))
    }

    fn source_description(&self) -> String {
        self.source.describe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CommandError, SourceError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticSource {
        xml: Result<String, SourceError>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(xml: Result<String, SourceError>) -> Self {
            Self {
                xml,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ReportSource for StaticSource {
        async fn fetch(&self) -> Result<String, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.xml.clone()
        }

        fn describe(&self) -> String {
            "static".to_string()
        }
    }

    const ONE_GPU: &str = "<nvidia_smi_log><driver_version>495.29.05</driver_version>\
        <cuda_version>11.5</cuda_version><attached_gpus>1</attached_gpus>\
        <gpu id=\"00000000:01:00.0\"><uuid>GPU-abc</uuid>\
        <temperature><gpu_temp>45 C</gpu_temp></temperature></gpu></nvidia_smi_log>";

    #[tokio::test]
    async fn test_render_metrics() {
        let service = MetricsCollectionService::new(Arc::new(StaticSource::new(Ok(
            ONE_GPU.to_string(),
        ))));

        let body = service.render_metrics().await.unwrap();
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines[0], "nvidiasmi_driver_version 495.29");
        assert_eq!(lines[1], "nvidiasmi_cuda_version 11.5");
        assert_eq!(lines[2], "nvidiasmi_attached_gpus 1");
        assert!(lines.contains(
            &"nvidiasmi_gpu_temp_celsius{id=\"00000000:01:00.0\",uuid=\"GPU-abc\",name=\"\"} 45"
        ));
    }

    #[tokio::test]
    async fn test_each_call_fetches_fresh_report() {
        let source = Arc::new(StaticSource::new(Ok(ONE_GPU.to_string())));
        let service = MetricsCollectionService::new(source.clone());

        let first = service.render_metrics().await.unwrap();
        let second = service.render_metrics().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_source_failure_is_reported() {
        let service = MetricsCollectionService::new(Arc::new(StaticSource::new(Err(
            SourceError::Command(CommandError::NotFound("nvidia-smi".to_string())),
        ))));

        let result = service.render_metrics().await;
        assert!(matches!(result, Err(ExportError::Source(_))));
    }

    #[tokio::test]
    async fn test_garbage_report_still_renders() {
        let service = MetricsCollectionService::new(Arc::new(StaticSource::new(Ok(
            "not xml at all".to_string(),
        ))));

        let report = service.collect_report().await.unwrap();
        assert!(report.devices.is_empty());

        let body = service.render_metrics().await.unwrap();
        assert_eq!(body.lines().count(), 3);
    }
}
