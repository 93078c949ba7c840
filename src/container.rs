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

//! Dependency injection container for the exporter

use crate::adapters::{
    router, NvidiaSmiReportSource, SampleFileReportSource, UnixCommandExecutor,
    DEFAULT_NVIDIA_SMI_PATH, SAMPLE_FILE_NAME,
};
use crate::domain::{ConfigError, MetricsCollectionService};
use crate::ports::{CommandExecutor, MetricsExportService, ReportSource};
use axum::Router;
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Default scrape port
pub const DEFAULT_PORT: u16 = 9202;

/// Where raw reports come from
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Run nvidia-smi on every scrape
    #[default]
    NvidiaSmi,
    /// Read a captured report from disk on every scrape
    SampleFile(PathBuf),
}

impl DataSource {
    /// Sample file named `nvidia-smi.sample.xml` inside `dir`
    pub fn sample_in(dir: &Path) -> Self {
        DataSource::SampleFile(dir.join(SAMPLE_FILE_NAME))
    }

    /// Sample file in the current working directory
    pub fn sample_in_working_dir() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::WorkingDirectory)?;
        Ok(Self::sample_in(&cwd))
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, DataSource::SampleFile(_))
    }
}

/// Configuration for the dependency injection container
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// listen_address = "127.0.0.1:9202"
/// nvidia_smi_path = "/usr/local/bin/nvidia-smi"
/// command_timeout_secs = 10
///
/// [data_source]
/// sample_file = "/var/lib/exporter/nvidia-smi.sample.xml"
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerConfig {
    /// Address the HTTP server binds to
    pub listen_address: SocketAddr,
    /// Path to the nvidia-smi binary
    pub nvidia_smi_path: String,
    /// Live or dry-run report source
    pub data_source: DataSource,
    /// Limit on a single nvidia-smi run, unlimited when unset
    pub command_timeout_secs: Option<u64>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            listen_address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            nvidia_smi_path: DEFAULT_NVIDIA_SMI_PATH.to_string(),
            data_source: DataSource::NvidiaSmi,
            command_timeout_secs: None,
        }
    }
}

impl ContainerConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }
}

/// Dependency injection container
pub struct ServiceContainer {
    config: ContainerConfig,
}

impl ServiceContainer {
    /// Create a new service container with configuration
    pub fn new(config: ContainerConfig) -> Self {
        Self { config }
    }

    /// Create a service container with default configuration
    pub fn with_defaults() -> Self {
        Self::new(ContainerConfig::default())
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Create the command executor, carrying the configured timeout
    pub fn create_command_executor(&self) -> Arc<dyn CommandExecutor> {
        Arc::new(UnixCommandExecutor::new(self.config.command_timeout()))
    }

    /// Create the report source selected by the configuration
    pub fn create_report_source(&self) -> Arc<dyn ReportSource> {
        match &self.config.data_source {
            DataSource::NvidiaSmi => Arc::new(NvidiaSmiReportSource::new(
                self.create_command_executor(),
                &self.config.nvidia_smi_path,
            )),
            DataSource::SampleFile(path) => Arc::new(SampleFileReportSource::new(path.clone())),
        }
    }

    /// Create the metrics export service
    pub fn create_metrics_service(&self) -> Arc<dyn MetricsExportService> {
        Arc::new(MetricsCollectionService::new(self.create_report_source()))
    }

    /// Create the HTTP router serving `/` and `/metrics`
    pub fn create_router(&self) -> Router {
        router(self.create_metrics_service())
    }

    /// Check that the configured nvidia-smi binary can be run
    ///
    /// Always true in dry-run mode.
    pub async fn validate_dependencies(&self) -> bool {
        if self.config.data_source.is_dry_run() {
            return true;
        }
        self.create_command_executor()
            .is_command_available(&self.config.nvidia_smi_path)
            .await
            .unwrap_or(false)
    }
}

/// Builder pattern for container configuration
pub struct ContainerConfigBuilder {
    config: ContainerConfig,
}

impl ContainerConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: ContainerConfig::default(),
        }
    }

    /// Start from an existing configuration
    pub fn from_config(config: ContainerConfig) -> Self {
        Self { config }
    }

    /// Set listen address
    pub fn listen_address(mut self, address: SocketAddr) -> Self {
        self.config.listen_address = address;
        self
    }

    /// Set nvidia-smi path
    pub fn nvidia_smi_path(mut self, path: &str) -> Self {
        self.config.nvidia_smi_path = path.to_string();
        self
    }

    /// Select the report source
    pub fn data_source(mut self, source: DataSource) -> Self {
        self.config.data_source = source;
        self
    }

    /// Set command timeout
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.command_timeout_secs = Some(timeout.as_secs());
        self
    }

    /// Build the configuration
    pub fn build(self) -> ContainerConfig {
        self.config
    }
}

impl Default for ContainerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CommandError;
    use crate::ports::SystemCommand;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_container_config_defaults() {
        let config = ContainerConfig::default();
        assert_eq!(config.listen_address.to_string(), "0.0.0.0:9202");
        assert_eq!(config.nvidia_smi_path, "/usr/bin/nvidia-smi");
        assert_eq!(config.data_source, DataSource::NvidiaSmi);
        assert_eq!(config.command_timeout(), None);
    }

    #[test]
    fn test_container_config_builder() {
        let config = ContainerConfigBuilder::new()
            .listen_address("127.0.0.1:9400".parse().unwrap())
            .nvidia_smi_path("/opt/bin/nvidia-smi")
            .data_source(DataSource::sample_in(Path::new("/srv")))
            .command_timeout(Duration::from_secs(15))
            .build();

        assert_eq!(config.listen_address.port(), 9400);
        assert_eq!(config.nvidia_smi_path, "/opt/bin/nvidia-smi");
        assert_eq!(
            config.data_source,
            DataSource::SampleFile(PathBuf::from("/srv/nvidia-smi.sample.xml"))
        );
        assert_eq!(config.command_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_config_from_toml() {
        let config = ContainerConfig::from_toml_str(
            r#"
listen_address = "127.0.0.1:9500"
command_timeout_secs = 10

[data_source]
sample_file = "/tmp/report.xml"
"#,
            Path::new("exporter.toml"),
        )
        .unwrap();

        assert_eq!(config.listen_address.port(), 9500);
        assert_eq!(config.nvidia_smi_path, DEFAULT_NVIDIA_SMI_PATH);
        assert_eq!(
            config.data_source,
            DataSource::SampleFile(PathBuf::from("/tmp/report.xml"))
        );
        assert_eq!(config.command_timeout_secs, Some(10));
    }

    #[test]
    fn test_config_from_toml_live_source() {
        let config = ContainerConfig::from_toml_str(
            "data_source = \"nvidia_smi\"",
            Path::new("exporter.toml"),
        )
        .unwrap();
        assert_eq!(config, ContainerConfig::default());
    }

    #[test]
    fn test_config_rejects_unknown_keys() {
        let err = ContainerConfig::from_toml_str("listen_port = 1", Path::new("exporter.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("exporter.toml"));
    }

    #[test]
    fn test_config_load_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "nvidia_smi_path = \"/usr/local/bin/nvidia-smi\"").unwrap();

        let config = ContainerConfig::load(file.path()).unwrap();
        assert_eq!(config.nvidia_smi_path, "/usr/local/bin/nvidia-smi");
    }

    #[test]
    fn test_config_load_missing_file() {
        let err = ContainerConfig::load(Path::new("/definitely/missing/exporter.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[tokio::test]
    async fn test_dry_run_dependencies_always_valid() {
        let container = ServiceContainer::new(
            ContainerConfigBuilder::new()
                .data_source(DataSource::sample_in(Path::new("/nonexistent")))
                .build(),
        );
        assert!(container.validate_dependencies().await);
    }

    #[tokio::test]
    async fn test_missing_binary_fails_validation() {
        let container = ServiceContainer::new(
            ContainerConfigBuilder::new()
                .nvidia_smi_path("/definitely/not/nvidia-smi")
                .build(),
        );
        assert!(!container.validate_dependencies().await);
    }

    #[tokio::test]
    async fn test_executor_carries_configured_timeout() {
        let container = ServiceContainer::new(
            ContainerConfigBuilder::new()
                .command_timeout(Duration::from_millis(1500))
                .build(),
        );
        assert_eq!(container.config().command_timeout_secs, Some(1));

        let executor = container.create_command_executor();
        let result = executor
            .execute(&SystemCommand::new("sleep").args(&["10"]))
            .await;
        assert!(matches!(result, Err(CommandError::Timeout(_))));
    }

    #[test]
    fn test_data_source_defaults_to_live() {
        assert_eq!(DataSource::default(), DataSource::NvidiaSmi);
        assert!(!DataSource::default().is_dry_run());
    }

    #[test]
    fn test_report_source_follows_data_source() {
        let live = ServiceContainer::with_defaults().create_report_source();
        assert_eq!(live.describe(), "/usr/bin/nvidia-smi -q -x");

        let dry = ServiceContainer::new(
            ContainerConfigBuilder::new()
                .data_source(DataSource::SampleFile(PathBuf::from("/srv/sample.xml")))
                .build(),
        )
        .create_report_source();
        assert_eq!(dry.describe(), "sample file /srv/sample.xml");
    }
}
