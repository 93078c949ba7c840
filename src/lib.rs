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

//! nvidia-smi Exporter Library
//!
//! This library republishes `nvidia-smi -q -x` reports as text metrics for a
//! Prometheus-style scraper, using a Ports and Adapters (Hexagonal)
//! architecture for maintainability and testability.
//!
//! # Architecture
//!
//! - **Domain**: report entities, the XML parser, value normalizers and the
//!   metric formatter
//! - **Ports**: interfaces for running commands, obtaining reports and serving metrics
//! - **Adapters**: unix command execution, nvidia-smi and sample-file sources,
//!   the axum HTTP router
//!
//! # Usage
//!
//! ## Formatting a captured report
//!
//! ```rust
//! use nvidia_smi_exporter::{format_report, parse_nvidia_smi_xml};
//!
//! let report = parse_nvidia_smi_xml(
//!     "<nvidia_smi_log><driver_version>535.129.03</driver_version></nvidia_smi_log>",
//! );
//! let body = format_report(&report);
//! assert!(body.starts_with("nvidiasmi_driver_version 535.129\n"));
//! ```
//!
//! ## Serving metrics
//!
//! ```rust,no_run
//! use nvidia_smi_exporter::{serve, ContainerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     serve(ContainerConfig::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod container;
pub mod domain;
pub mod ports;

pub use adapters::{
    router, NvidiaSmiReportSource, SampleFileReportSource, UnixCommandExecutor, METRICS_PATH,
};
pub use container::{ContainerConfig, ContainerConfigBuilder, DataSource, ServiceContainer};
pub use domain::{
    format_report, parse_nvidia_smi_xml, render_report, ConfigError, DeviceReport, ExportError,
    MetricLine, ProcessRecord, RunReport, SourceError,
};
pub use ports::{CommandExecutor, MetricsExportService, ReportSource};

use std::sync::Arc;

/// Create a metrics export service with the given configuration
///
/// # Arguments
/// * `config` - Container configuration (data source, nvidia-smi path, timeout)
///
/// # Returns
/// * Configured metrics export service
pub fn create_service(config: ContainerConfig) -> Arc<dyn MetricsExportService> {
    ServiceContainer::new(config).create_metrics_service()
}

/// Bind the configured address and serve metrics until Ctrl-C
///
/// # Arguments
/// * `config` - Container configuration
///
/// # Returns
/// * `Ok(())` - Server shut down cleanly
/// * `Err(std::io::Error)` - The listen address could not be bound
pub async fn serve(config: ContainerConfig) -> std::io::Result<()> {
    let container = ServiceContainer::new(config);
    let config = container.config();

    if config.data_source.is_dry_run() {
        log::info!("Test mode is enabled");
    }
    if !container.validate_dependencies().await {
        log::warn!(
            "{} is not available; scrapes will return empty responses",
            config.nvidia_smi_path
        );
    }

    let service = container.create_metrics_service();
    log::info!("Reading reports from {}", service.source_description());

    let listener = tokio::net::TcpListener::bind(config.listen_address).await?;
    log::info!("Nvidia SMI exporter listening on {}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}
