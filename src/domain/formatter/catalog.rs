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

//! Declarative list of every exported field
//!
//! Emission order follows the order of these tables.

use crate::domain::parsers::{flag, numeric_strip, unit_scale, version_extract};
use crate::domain::{DeviceReport, ProcessRecord, RunReport};

/// How a raw field string becomes a metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalizer {
    /// Counts, percentages and enumerated codes
    Numeric,
    /// Values carrying an SI or binary magnitude and a unit
    UnitScale,
    /// Free-form version strings
    Version,
    /// On/Off style switches
    Flag,
}

impl Normalizer {
    pub fn apply(self, raw: &str) -> String {
        match self {
            Normalizer::Numeric => numeric_strip(raw),
            Normalizer::UnitScale => unit_scale(raw),
            Normalizer::Version => version_extract(raw),
            Normalizer::Flag => flag(raw),
        }
    }
}

/// One exported field of type `T`
pub struct FieldMetric<T> {
    pub name: &'static str,
    pub read: fn(&T) -> &str,
    pub normalizer: Normalizer,
}

impl<T> FieldMetric<T> {
    /// Read and normalize this field from `source`
    pub fn value(&self, source: &T) -> String {
        self.normalizer.apply((self.read)(source))
    }
}

pub type RunMetric = FieldMetric<RunReport>;
pub type DeviceMetric = FieldMetric<DeviceReport>;
pub type ProcessMetric = FieldMetric<ProcessRecord>;

pub static RUN_METRICS: &[RunMetric] = &[
    RunMetric {
        name: "nvidiasmi_driver_version",
        read: |r| r.driver_version.as_str(),
        normalizer: Normalizer::Version,
    },
    RunMetric {
        name: "nvidiasmi_cuda_version",
        read: |r| r.cuda_version.as_str(),
        normalizer: Normalizer::Version,
    },
    RunMetric {
        name: "nvidiasmi_attached_gpus",
        read: |r| r.attached_gpus.as_str(),
        normalizer: Normalizer::Numeric,
    },
];

pub static DEVICE_METRICS: &[DeviceMetric] = &[
    // pci
    DeviceMetric {
        name: "nvidiasmi_pci_pcie_gen_max",
        read: |d| d.pci.link_gen_max.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_pci_pcie_gen_current",
        read: |d| d.pci.link_gen_current.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_pci_link_width_max_multiplicator",
        read: |d| d.pci.link_width_max.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_pci_link_width_current_multiplicator",
        read: |d| d.pci.link_width_current.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_pci_replay_counter",
        read: |d| d.pci.replay_counter.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_pci_replay_rollover_counter",
        read: |d| d.pci.replay_rollover_counter.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_pci_tx_util_bytes_per_second",
        read: |d| d.pci.tx_util.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_pci_rx_util_bytes_per_second",
        read: |d| d.pci.rx_util.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    // runtime state
    DeviceMetric {
        name: "nvidiasmi_fan_speed_percent",
        read: |d| d.fan_speed.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_performance_state_int",
        read: |d| d.performance_state.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_accounting_mode_buffer_size",
        read: |d| d.identity.accounting_mode_buffer_size.as_str(),
        normalizer: Normalizer::Numeric,
    },
    // memory
    DeviceMetric {
        name: "nvidiasmi_fb_memory_usage_total_bytes",
        read: |d| d.fb_memory.total.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_fb_memory_usage_used_bytes",
        read: |d| d.fb_memory.used.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_fb_memory_usage_free_bytes",
        read: |d| d.fb_memory.free.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_bar1_memory_usage_total_bytes",
        read: |d| d.bar1_memory.total.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_bar1_memory_usage_used_bytes",
        read: |d| d.bar1_memory.used.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_bar1_memory_usage_free_bytes",
        read: |d| d.bar1_memory.free.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    // utilization
    DeviceMetric {
        name: "nvidiasmi_utilization_gpu_percent",
        read: |d| d.utilization.gpu.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_utilization_memory_percent",
        read: |d| d.utilization.memory.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_utilization_encoder_percent",
        read: |d| d.utilization.encoder.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_utilization_decoder_percent",
        read: |d| d.utilization.decoder.as_str(),
        normalizer: Normalizer::Numeric,
    },
    // encoder and frame buffer capture sessions
    DeviceMetric {
        name: "nvidiasmi_encoder_session_count",
        read: |d| d.encoder_stats.session_count.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_encoder_average_fps",
        read: |d| d.encoder_stats.average_fps.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_encoder_average_latency",
        read: |d| d.encoder_stats.average_latency.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_fbc_session_count",
        read: |d| d.fbc_stats.session_count.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_fbc_average_fps",
        read: |d| d.fbc_stats.average_fps.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_fbc_average_latency",
        read: |d| d.fbc_stats.average_latency.as_str(),
        normalizer: Normalizer::Numeric,
    },
    // temperature
    DeviceMetric {
        name: "nvidiasmi_gpu_temp_celsius",
        read: |d| d.temperature.gpu.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_gpu_temp_max_threshold_celsius",
        read: |d| d.temperature.gpu_max_threshold.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_gpu_temp_slow_threshold_celsius",
        read: |d| d.temperature.gpu_slow_threshold.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_gpu_temp_max_gpu_threshold_celsius",
        read: |d| d.temperature.gpu_max_gpu_threshold.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_memory_temp_celsius",
        read: |d| d.temperature.memory.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_gpu_temp_max_mem_threshold_celsius",
        read: |d| d.temperature.gpu_max_mem_threshold.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    // power
    DeviceMetric {
        name: "nvidiasmi_power_state_int",
        read: |d| d.power.state.as_str(),
        normalizer: Normalizer::Numeric,
    },
    DeviceMetric {
        name: "nvidiasmi_power_draw_watts",
        read: |d| d.power.draw.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_power_limit_watts",
        read: |d| d.power.limit.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_default_power_limit_watts",
        read: |d| d.power.default_limit.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_enforced_power_limit_watts",
        read: |d| d.power.enforced_limit.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_min_power_limit_watts",
        read: |d| d.power.min_limit.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_max_power_limit_watts",
        read: |d| d.power.max_limit.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    // clocks
    DeviceMetric {
        name: "nvidiasmi_clock_graphics_hertz",
        read: |d| d.clocks.graphics.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_clock_graphics_max_hertz",
        read: |d| d.max_clocks.graphics.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_clock_sm_hertz",
        read: |d| d.clocks.sm.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_clock_sm_max_hertz",
        read: |d| d.max_clocks.sm.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_clock_mem_hertz",
        read: |d| d.clocks.mem.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_clock_mem_max_hertz",
        read: |d| d.max_clocks.mem.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_clock_video_hertz",
        read: |d| d.clocks.video.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_clock_video_max_hertz",
        read: |d| d.max_clocks.video.as_str(),
        normalizer: Normalizer::UnitScale,
    },
    DeviceMetric {
        name: "nvidiasmi_clock_policy_auto_boost",
        read: |d| d.clock_policy.auto_boost.as_str(),
        normalizer: Normalizer::Flag,
    },
    DeviceMetric {
        name: "nvidiasmi_clock_policy_auto_boost_default",
        read: |d| d.clock_policy.auto_boost_default.as_str(),
        normalizer: Normalizer::Flag,
    },
];

pub static PROCESS_METRICS: &[ProcessMetric] = &[ProcessMetric {
    name: "nvidiasmi_process_used_memory_bytes",
    read: |p| p.used_memory.as_str(),
    normalizer: Normalizer::UnitScale,
}];
