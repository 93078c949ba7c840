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

//! Typed view of one `nvidia-smi -q -x` run
//!
//! Every leaf is kept as the raw string nvidia-smi printed. Values such as
//! `"250.00 W"` or `"N/A"` are only turned into numbers by the normalizers at
//! emission time.

/// Result of a single diagnostics invocation (root aggregate)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Driver version, e.g. `535.129.03`
    pub driver_version: String,
    /// CUDA runtime version, e.g. `12.2`
    pub cuda_version: String,
    /// Number of attached GPUs as reported by the tool
    pub attached_gpus: String,
    /// One entry per `<gpu>` element, in report order
    pub devices: Vec<DeviceReport>,
}

impl RunReport {
    /// Resolve the top-level field addressed by an element path below the root
    pub(crate) fn field_mut(&mut self, path: &[&str]) -> Option<&mut String> {
        match path {
            ["driver_version"] => Some(&mut self.driver_version),
            ["cuda_version"] => Some(&mut self.cuda_version),
            ["attached_gpus"] => Some(&mut self.attached_gpus),
            _ => None,
        }
    }

    /// Total number of process records across all devices
    pub fn process_count(&self) -> usize {
        self.devices.iter().map(|d| d.processes.len()).sum()
    }
}

/// State of one physical GPU
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceReport {
    /// Value of the `id` attribute on `<gpu>` (the PCI bus id)
    pub id: String,
    pub identity: DeviceIdentity,
    pub pci: PciInfo,
    /// Fan speed, e.g. `"30 %"`
    pub fan_speed: String,
    /// Performance state, e.g. `"P8"`
    pub performance_state: String,
    pub compute_mode: String,
    pub operation_mode: OperationMode,
    pub virtualization: VirtualizationMode,
    pub utilization: Utilization,
    pub encoder_stats: SessionStats,
    pub fbc_stats: SessionStats,
    pub fb_memory: MemoryUsage,
    pub bar1_memory: MemoryUsage,
    pub temperature: Temperature,
    pub power: PowerReadings,
    pub clocks: ClockSet,
    pub max_clocks: ClockSet,
    pub clock_policy: ClockPolicy,
    /// Processes running on the device, in report order
    pub processes: Vec<ProcessRecord>,
}

impl DeviceReport {
    /// Resolve the field addressed by an element path below `<gpu>`
    ///
    /// Paths into `<processes><process_info>` are routed to the most recently
    /// opened process record. Unknown paths resolve to `None` and are ignored
    /// by the parser.
    pub(crate) fn field_mut(&mut self, path: &[&str]) -> Option<&mut String> {
        match path {
            ["product_name"] => Some(&mut self.identity.product_name),
            ["product_brand"] => Some(&mut self.identity.product_brand),
            ["display_mode"] => Some(&mut self.identity.display_mode),
            ["display_active"] => Some(&mut self.identity.display_active),
            ["persistence_mode"] => Some(&mut self.identity.persistence_mode),
            ["accounting_mode"] => Some(&mut self.identity.accounting_mode),
            ["accounting_mode_buffer_size"] => {
                Some(&mut self.identity.accounting_mode_buffer_size)
            }
            ["driver_model", "current_dm"] => Some(&mut self.identity.driver_model_current),
            ["driver_model", "pending_dm"] => Some(&mut self.identity.driver_model_pending),
            ["serial"] => Some(&mut self.identity.serial),
            ["uuid"] => Some(&mut self.identity.uuid),
            ["minor_number"] => Some(&mut self.identity.minor_number),
            ["vbios_version"] => Some(&mut self.identity.vbios_version),
            ["multigpu_board"] => Some(&mut self.identity.multigpu_board),
            ["board_id"] => Some(&mut self.identity.board_id),
            ["gpu_part_number"] => Some(&mut self.identity.part_number),
            ["inforom_version", "img_version"] => Some(&mut self.identity.inforom.image),
            ["inforom_version", "oem_object"] => Some(&mut self.identity.inforom.oem),
            ["inforom_version", "ecc_object"] => Some(&mut self.identity.inforom.ecc),
            ["inforom_version", "pwr_object"] => Some(&mut self.identity.inforom.power),

            ["gpu_operation_mode", "current_gom"] => Some(&mut self.operation_mode.current),
            ["gpu_operation_mode", "pending_gom"] => Some(&mut self.operation_mode.pending),
            ["gpu_virtualization_mode", "virtualization_mode"] => {
                Some(&mut self.virtualization.mode)
            }
            ["gpu_virtualization_mode", "host_vgpu_mode"] => {
                Some(&mut self.virtualization.host_vgpu_mode)
            }

            ["pci", rest @ ..] => self.pci.field_mut(rest),

            ["fan_speed"] => Some(&mut self.fan_speed),
            ["performance_state"] => Some(&mut self.performance_state),
            ["compute_mode"] => Some(&mut self.compute_mode),

            ["fb_memory_usage", rest @ ..] => self.fb_memory.field_mut(rest),
            ["bar1_memory_usage", rest @ ..] => self.bar1_memory.field_mut(rest),

            ["utilization", "gpu_util"] => Some(&mut self.utilization.gpu),
            ["utilization", "memory_util"] => Some(&mut self.utilization.memory),
            ["utilization", "encoder_util"] => Some(&mut self.utilization.encoder),
            ["utilization", "decoder_util"] => Some(&mut self.utilization.decoder),

            ["encoder_stats", rest @ ..] => self.encoder_stats.field_mut(rest),
            ["fbc_stats", rest @ ..] => self.fbc_stats.field_mut(rest),

            ["temperature", rest @ ..] => self.temperature.field_mut(rest),
            ["power_readings" | "gpu_power_readings", rest @ ..] => self.power.field_mut(rest),

            ["clocks", rest @ ..] => self.clocks.field_mut(rest),
            ["max_clocks", rest @ ..] => self.max_clocks.field_mut(rest),
            ["clock_policy", "auto_boost"] => Some(&mut self.clock_policy.auto_boost),
            ["clock_policy", "auto_boost_default"] => {
                Some(&mut self.clock_policy.auto_boost_default)
            }

            ["processes", "process_info", rest @ ..] => self.processes.last_mut()?.field_mut(rest),

            _ => None,
        }
    }

    /// Globally unique identifier, e.g. `GPU-5c1b...`
    pub fn uuid(&self) -> &str {
        &self.identity.uuid
    }
}

/// Opaque identity strings of a device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceIdentity {
    pub product_name: String,
    pub product_brand: String,
    pub display_mode: String,
    pub display_active: String,
    pub persistence_mode: String,
    pub accounting_mode: String,
    pub accounting_mode_buffer_size: String,
    pub driver_model_current: String,
    pub driver_model_pending: String,
    pub serial: String,
    pub uuid: String,
    /// Device index (`/dev/nvidiaN`)
    pub minor_number: String,
    pub vbios_version: String,
    pub multigpu_board: String,
    pub board_id: String,
    pub part_number: String,
    pub inforom: InforomVersions,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InforomVersions {
    pub image: String,
    pub oem: String,
    pub ecc: String,
    pub power: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationMode {
    pub current: String,
    pub pending: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualizationMode {
    pub mode: String,
    pub host_vgpu_mode: String,
}

/// PCI topology and link state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PciInfo {
    pub bus: String,
    pub device: String,
    pub domain: String,
    pub device_id: String,
    pub bus_id: String,
    pub sub_system_id: String,
    pub link_gen_max: String,
    pub link_gen_current: String,
    /// Link width, e.g. `"16x"`
    pub link_width_max: String,
    pub link_width_current: String,
    pub bridge_chip_type: String,
    pub bridge_chip_firmware: String,
    pub replay_counter: String,
    pub replay_rollover_counter: String,
    /// Throughput, e.g. `"12000 KB/s"`
    pub tx_util: String,
    pub rx_util: String,
}

impl PciInfo {
    fn field_mut(&mut self, path: &[&str]) -> Option<&mut String> {
        match path {
            ["pci_bus"] => Some(&mut self.bus),
            ["pci_device"] => Some(&mut self.device),
            ["pci_domain"] => Some(&mut self.domain),
            ["pci_device_id"] => Some(&mut self.device_id),
            ["pci_bus_id"] => Some(&mut self.bus_id),
            ["pci_sub_system_id"] => Some(&mut self.sub_system_id),
            ["pci_gpu_link_info", "pcie_gen", "max_link_gen"] => Some(&mut self.link_gen_max),
            ["pci_gpu_link_info", "pcie_gen", "current_link_gen"] => {
                Some(&mut self.link_gen_current)
            }
            ["pci_gpu_link_info", "link_widths", "max_link_width"] => {
                Some(&mut self.link_width_max)
            }
            ["pci_gpu_link_info", "link_widths", "current_link_width"] => {
                Some(&mut self.link_width_current)
            }
            ["pci_bridge_chip", "bridge_chip_type"] => Some(&mut self.bridge_chip_type),
            ["pci_bridge_chip", "bridge_chip_fw"] => Some(&mut self.bridge_chip_firmware),
            ["replay_counter"] => Some(&mut self.replay_counter),
            ["replay_rollover_counter"] => Some(&mut self.replay_rollover_counter),
            ["tx_util"] => Some(&mut self.tx_util),
            ["rx_util"] => Some(&mut self.rx_util),
            _ => None,
        }
    }
}

/// Utilization percentages
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Utilization {
    pub gpu: String,
    pub memory: String,
    pub encoder: String,
    pub decoder: String,
}

/// Encoder or frame buffer capture session statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    pub session_count: String,
    pub average_fps: String,
    pub average_latency: String,
}

impl SessionStats {
    fn field_mut(&mut self, path: &[&str]) -> Option<&mut String> {
        match path {
            ["session_count"] => Some(&mut self.session_count),
            ["average_fps"] => Some(&mut self.average_fps),
            ["average_latency"] => Some(&mut self.average_latency),
            _ => None,
        }
    }
}

/// Capacity of one memory region, e.g. `"24576 MiB"`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryUsage {
    pub total: String,
    pub used: String,
    pub free: String,
}

impl MemoryUsage {
    fn field_mut(&mut self, path: &[&str]) -> Option<&mut String> {
        match path {
            ["total"] => Some(&mut self.total),
            ["used"] => Some(&mut self.used),
            ["free"] => Some(&mut self.free),
            _ => None,
        }
    }
}

/// Temperatures and thresholds, e.g. `"45 C"`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Temperature {
    pub gpu: String,
    pub gpu_max_threshold: String,
    pub gpu_slow_threshold: String,
    pub gpu_max_gpu_threshold: String,
    pub memory: String,
    pub gpu_max_mem_threshold: String,
}

impl Temperature {
    fn field_mut(&mut self, path: &[&str]) -> Option<&mut String> {
        match path {
            ["gpu_temp"] => Some(&mut self.gpu),
            ["gpu_temp_max_threshold"] => Some(&mut self.gpu_max_threshold),
            ["gpu_temp_slow_threshold"] => Some(&mut self.gpu_slow_threshold),
            ["gpu_temp_max_gpu_threshold"] => Some(&mut self.gpu_max_gpu_threshold),
            ["memory_temp"] => Some(&mut self.memory),
            ["gpu_temp_max_mem_threshold"] => Some(&mut self.gpu_max_mem_threshold),
            _ => None,
        }
    }
}

/// Power state and limits, e.g. `"250.00 W"`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerReadings {
    pub state: String,
    pub draw: String,
    pub limit: String,
    pub default_limit: String,
    pub enforced_limit: String,
    pub min_limit: String,
    pub max_limit: String,
}

impl PowerReadings {
    fn field_mut(&mut self, path: &[&str]) -> Option<&mut String> {
        match path {
            ["power_state"] => Some(&mut self.state),
            ["power_draw"] => Some(&mut self.draw),
            ["power_limit" | "current_power_limit"] => Some(&mut self.limit),
            ["default_power_limit"] => Some(&mut self.default_limit),
            ["enforced_power_limit"] => Some(&mut self.enforced_limit),
            ["min_power_limit"] => Some(&mut self.min_limit),
            ["max_power_limit"] => Some(&mut self.max_limit),
            _ => None,
        }
    }
}

/// One clock reading per domain, e.g. `"1530 MHz"`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClockSet {
    pub graphics: String,
    pub sm: String,
    pub mem: String,
    pub video: String,
}

impl ClockSet {
    fn field_mut(&mut self, path: &[&str]) -> Option<&mut String> {
        match path {
            ["graphics_clock"] => Some(&mut self.graphics),
            ["sm_clock"] => Some(&mut self.sm),
            ["mem_clock"] => Some(&mut self.mem),
            ["video_clock"] => Some(&mut self.video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClockPolicy {
    pub auto_boost: String,
    pub auto_boost_default: String,
}

/// A process holding a context on a device
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessRecord {
    pub pid: String,
    /// `C` (compute), `G` (graphics) or `C+G`
    pub type_: String,
    pub process_name: String,
    /// Memory footprint, e.g. `"1024 MiB"`
    pub used_memory: String,
}

impl ProcessRecord {
    fn field_mut(&mut self, path: &[&str]) -> Option<&mut String> {
        match path {
            ["pid"] => Some(&mut self.pid),
            ["type"] => Some(&mut self.type_),
            ["process_name"] => Some(&mut self.process_name),
            ["used_memory"] => Some(&mut self.used_memory),
            _ => None,
        }
    }
}
