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

//! Rendering of a [`RunReport`] as text metric lines
//!
//! Output is `name{label="value",...} value`, one line per field. Lines are
//! produced in a fixed order: run-level metrics, then for each device its info
//! line and catalog metrics, then its process metrics.

pub mod catalog;

pub use catalog::{
    DeviceMetric, FieldMetric, Normalizer, ProcessMetric, RunMetric, DEVICE_METRICS,
    PROCESS_METRICS, RUN_METRICS,
};

use crate::domain::{DeviceReport, ProcessRecord, RunReport};
use std::fmt;

/// Name of the per-device line carrying the identity strings as labels
pub const DEVICE_INFO_METRIC: &str = "nvidiasmi_gpu_info";

/// A single `name{labels} value` record
#[derive(Debug, Clone, PartialEq)]
pub struct MetricLine {
    pub name: &'static str,
    pub labels: Vec<(&'static str, String)>,
    pub value: String,
}

impl MetricLine {
    pub fn new(name: &'static str, labels: Vec<(&'static str, String)>, value: String) -> Self {
        Self {
            name,
            labels,
            value,
        }
    }

    /// Look up a label value by key
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for MetricLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)?;
        if !self.labels.is_empty() {
            f.write_str("{")?;
            for (i, (key, value)) in self.labels.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write!(f, "{}=\"{}\"", key, escape_label_value(value))?;
            }
            f.write_str("}")?;
        }
        write!(f, " {}", self.value)
    }
}

/// Escape a label value for the text exposition format
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Labels attached to every device-scoped line
fn device_labels(device: &DeviceReport) -> Vec<(&'static str, String)> {
    vec![
        ("id", device.id.clone()),
        ("uuid", device.identity.uuid.clone()),
        ("name", device.identity.product_name.clone()),
    ]
}

fn device_info_line(device: &DeviceReport) -> MetricLine {
    let identity = &device.identity;
    let mut labels = device_labels(device);
    labels.extend([
        ("brand", identity.product_brand.clone()),
        ("serial", identity.serial.clone()),
        ("minor_number", identity.minor_number.clone()),
        ("board_id", identity.board_id.clone()),
        ("part_number", identity.part_number.clone()),
        ("vbios_version", identity.vbios_version.clone()),
        ("driver_model", identity.driver_model_current.clone()),
        ("persistence_mode", identity.persistence_mode.clone()),
        ("compute_mode", device.compute_mode.clone()),
        ("operation_mode", device.operation_mode.current.clone()),
        ("virtualization_mode", device.virtualization.mode.clone()),
    ]);
    MetricLine::new(DEVICE_INFO_METRIC, labels, "1".to_string())
}

fn process_labels(
    base: &[(&'static str, String)],
    process: &ProcessRecord,
) -> Vec<(&'static str, String)> {
    let mut labels = base.to_vec();
    labels.extend([
        ("process_name", process.process_name.clone()),
        ("process_pid", process.pid.clone()),
        ("process_type", process.type_.clone()),
    ]);
    labels
}

/// Walk a report and produce every metric line in emission order
///
/// # Arguments
/// * `report` - Parsed nvidia-smi run
///
/// # Returns
/// * `3 + devices * (1 + DEVICE_METRICS.len()) + processes * PROCESS_METRICS.len()` lines
pub fn render_report(report: &RunReport) -> Vec<MetricLine> {
    let capacity = RUN_METRICS.len()
        + report.devices.len() * (1 + DEVICE_METRICS.len())
        + report.process_count() * PROCESS_METRICS.len();
    let mut lines = Vec::with_capacity(capacity);

    for metric in RUN_METRICS {
        lines.push(MetricLine::new(metric.name, Vec::new(), metric.value(report)));
    }

    for device in &report.devices {
        let labels = device_labels(device);
        lines.push(device_info_line(device));

        for metric in DEVICE_METRICS {
            lines.push(MetricLine::new(metric.name, labels.clone(), metric.value(device)));
        }

        for process in &device.processes {
            let labels = process_labels(&labels, process);
            for metric in PROCESS_METRICS {
                lines.push(MetricLine::new(metric.name, labels.clone(), metric.value(process)));
            }
        }
    }

    lines
}

/// Render a report as the scrape response body
pub fn format_report(report: &RunReport) -> String {
    let mut body = String::new();
    for line in render_report(report) {
        body.push_str(&line.to_string());
        body.push('\n');
    }
    body
}
