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

use clap::Parser;
use nvidia_smi_exporter::{serve, ContainerConfig, ContainerConfigBuilder, DataSource};
use std::error::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "nvidia_smi_exporter", version, about)]
struct Opt {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to serve metrics on
    #[arg(long)]
    listen_address: Option<SocketAddr>,

    /// Path to the nvidia-smi binary
    #[arg(long)]
    nvidia_smi_path: Option<String>,

    /// Abort nvidia-smi after this many seconds
    #[arg(long)]
    command_timeout: Option<u64>,

    /// Set to 1 to read nvidia-smi.sample.xml from the working directory instead of running nvidia-smi
    #[arg(long, env = "TEST_MODE", value_name = "FLAG")]
    test_mode: Option<String>,

    /// Read this captured report instead of running nvidia-smi
    #[arg(long)]
    sample_file: Option<PathBuf>,
}

impl Opt {
    /// Dry-run is enabled only by the exact value `1`
    fn dry_run_requested(&self) -> bool {
        self.test_mode.as_deref() == Some("1")
    }

    /// Layer command line and environment over the file configuration
    fn into_config(self) -> Result<ContainerConfig, Box<dyn Error>> {
        let base = match &self.config {
            Some(path) => ContainerConfig::load(path)?,
            None => ContainerConfig::default(),
        };
        let mut builder = ContainerConfigBuilder::from_config(base);

        if self.dry_run_requested() {
            builder = builder.data_source(DataSource::sample_in_working_dir()?);
        }
        if let Some(path) = self.sample_file {
            builder = builder.data_source(DataSource::SampleFile(path));
        }
        if let Some(address) = self.listen_address {
            builder = builder.listen_address(address);
        }
        if let Some(path) = &self.nvidia_smi_path {
            builder = builder.nvidia_smi_path(path);
        }
        if let Some(secs) = self.command_timeout {
            builder = builder.command_timeout(Duration::from_secs(secs));
        }

        Ok(builder.build())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Opt::parse().into_config()?;
    serve(config).await?;

    Ok(())
}
