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

//! nvidia-smi XML report parsing

use crate::domain::{DeviceReport, ProcessRecord, RunReport};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const ROOT_ELEMENT: &str = "nvidia_smi_log";
const DEVICE_ELEMENT: &str = "gpu";

/// Parse the output of `nvidia-smi -q -x`
///
/// Expected command: `nvidia-smi -q -x`
///
/// The parser is schema tolerant: unknown elements are skipped and missing
/// elements leave the corresponding field empty. It never fails. On malformed
/// XML it stops at the first error and returns everything read up to that
/// point.
///
/// # Arguments
///
/// * `output` - XML document printed by nvidia-smi
///
/// # Returns
///
/// The run report, possibly partial.
pub fn parse_nvidia_smi_xml(output: &str) -> RunReport {
    let mut reader = Reader::from_str(output);
    reader.config_mut().trim_text(true);

    let mut report = RunReport::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                path.push(element_name(&element));
                open_element(&mut report, &path, &element);
            }
            Ok(Event::Empty(element)) => {
                path.push(element_name(&element));
                open_element(&mut report, &path, &element);
                path.pop();
            }
            Ok(Event::End(_)) => {
                path.pop();
            }
            Ok(Event::Text(text)) => match text.unescape() {
                Ok(text) => assign_text(&mut report, &path, &text),
                Err(e) => {
                    log::debug!(
                        "Stopping nvidia-smi XML parse at byte {}: {e}",
                        reader.buffer_position()
                    );
                    break;
                }
            },
            Ok(Event::CData(data)) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                assign_text(&mut report, &path, &text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                log::debug!(
                    "Stopping nvidia-smi XML parse at byte {}: {e}",
                    reader.buffer_position()
                );
                break;
            }
        }
    }

    report
}

fn element_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Create the records that repeated elements stand for
fn open_element(report: &mut RunReport, path: &[String], element: &BytesStart<'_>) {
    let path: Vec<&str> = path.iter().map(String::as_str).collect();
    match path.as_slice() {
        [ROOT_ELEMENT, DEVICE_ELEMENT] => {
            let mut device = DeviceReport::default();
            if let Some(id) = attribute(element, "id") {
                device.id = id;
            }
            report.devices.push(device);
        }
        [ROOT_ELEMENT, DEVICE_ELEMENT, "processes", "process_info"] => {
            if let Some(device) = report.devices.last_mut() {
                device.processes.push(ProcessRecord::default());
            }
        }
        _ => {}
    }
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name.as_bytes())
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

/// Store element text into the field addressed by the current path
fn assign_text(report: &mut RunReport, path: &[String], text: &str) {
    let path: Vec<&str> = path.iter().map(String::as_str).collect();
    let slot = match path.as_slice() {
        [ROOT_ELEMENT, DEVICE_ELEMENT, rest @ ..] => report
            .devices
            .last_mut()
            .and_then(|device| device.field_mut(rest)),
        [ROOT_ELEMENT, rest @ ..] => report.field_mut(rest),
        _ => None,
    };

    if let Some(slot) = slot {
        *slot = text.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_GPUS: &str = r#"<?xml version="1.0" ?>
<!DOCTYPE nvidia_smi_log SYSTEM "nvsmi_device_v11.dtd">
<nvidia_smi_log>
    <timestamp>Mon Feb  1 10:00:00 2021</timestamp>
    <driver_version>460.32.03</driver_version>
    <cuda_version>11.2</cuda_version>
    <attached_gpus>2</attached_gpus>
    <gpu id="00000000:01:00.0">
        <product_name>Tesla T4</product_name>
        <uuid>GPU-aaaa</uuid>
        <pci>
            <pci_gpu_link_info>
                <pcie_gen>
                    <max_link_gen>3</max_link_gen>
                    <current_link_gen>1</current_link_gen>
                </pcie_gen>
                <link_widths>
                    <max_link_width>16x</max_link_width>
                    <current_link_width>16x</current_link_width>
                </link_widths>
            </pci_gpu_link_info>
            <tx_util>0 KB/s</tx_util>
        </pci>
        <fb_memory_usage>
            <total>15109 MiB</total>
            <used>0 MiB</used>
            <free>15109 MiB</free>
        </fb_memory_usage>
        <clocks_throttle_reasons>
            <clocks_throttle_reason_gpu_idle>Active</clocks_throttle_reason_gpu_idle>
        </clocks_throttle_reasons>
        <processes>
            <process_info>
                <pid>1234</pid>
                <type>C</type>
                <process_name>python</process_name>
                <used_memory>1024 MiB</used_memory>
            </process_info>
            <process_info>
                <pid>5678</pid>
                <type>G</type>
                <process_name>Xorg</process_name>
                <used_memory>12 MiB</used_memory>
            </process_info>
        </processes>
    </gpu>
    <gpu id="00000000:02:00.0">
        <product_name>Tesla T4</product_name>
        <uuid>GPU-bbbb</uuid>
        <processes>
        </processes>
    </gpu>
</nvidia_smi_log>
"#;

    #[test]
    fn test_parse_top_level_fields() {
        let report = parse_nvidia_smi_xml(TWO_GPUS);
        assert_eq!(report.driver_version, "460.32.03");
        assert_eq!(report.cuda_version, "11.2");
        assert_eq!(report.attached_gpus, "2");
        assert_eq!(report.devices.len(), 2);
    }

    #[test]
    fn test_parse_device_sections() {
        let report = parse_nvidia_smi_xml(TWO_GPUS);
        let gpu = &report.devices[0];

        assert_eq!(gpu.id, "00000000:01:00.0");
        assert_eq!(gpu.uuid(), "GPU-aaaa");
        assert_eq!(gpu.identity.product_name, "Tesla T4");
        assert_eq!(gpu.pci.link_gen_max, "3");
        assert_eq!(gpu.pci.link_width_current, "16x");
        assert_eq!(gpu.pci.tx_util, "0 KB/s");
        assert_eq!(gpu.fb_memory.total, "15109 MiB");
        // absent sections stay empty
        assert_eq!(gpu.power.draw, "");
        assert_eq!(gpu.temperature.gpu, "");
    }

    #[test]
    fn test_parse_processes_in_order() {
        let report = parse_nvidia_smi_xml(TWO_GPUS);

        let processes = &report.devices[0].processes;
        assert_eq!(processes.len(), 2);
        assert_eq!(processes[0].pid, "1234");
        assert_eq!(processes[0].process_name, "python");
        assert_eq!(processes[1].type_, "G");
        assert_eq!(processes[1].used_memory, "12 MiB");

        assert!(report.devices[1].processes.is_empty());
        assert_eq!(report.devices[1].id, "00000000:02:00.0");
    }

    #[test]
    fn test_parse_empty_input() {
        let report = parse_nvidia_smi_xml("");
        assert_eq!(report, RunReport::default());
    }

    #[test]
    fn test_parse_foreign_document() {
        let report = parse_nvidia_smi_xml(
            "<inventory><driver_version>1.0</driver_version><gpu id=\"x\"/></inventory>",
        );
        assert!(report.driver_version.is_empty());
        assert!(report.devices.is_empty());
    }

    #[test]
    fn test_parse_not_xml() {
        let report = parse_nvidia_smi_xml("NVIDIA-SMI has failed because it couldn't communicate");
        assert!(report.driver_version.is_empty());
        assert!(report.devices.is_empty());
    }

    #[test]
    fn test_parse_truncated_keeps_partial_report() {
        let truncated = "<nvidia_smi_log><driver_version>535.129.03</driver_version>\
            <gpu id=\"0\"><uuid>GPU-cccc</uuid><fb_memory_usage><total>80 GiB</to";
        let report = parse_nvidia_smi_xml(truncated);

        assert_eq!(report.driver_version, "535.129.03");
        assert_eq!(report.devices.len(), 1);
        assert_eq!(report.devices[0].uuid(), "GPU-cccc");
        assert!(report.cuda_version.is_empty());
    }

    #[test]
    fn test_parse_mismatched_tags_keeps_partial_report() {
        let broken = "<nvidia_smi_log><driver_version>550.54</cuda_version>\
            <attached_gpus>1</attached_gpus></nvidia_smi_log>";
        let report = parse_nvidia_smi_xml(broken);

        assert_eq!(report.driver_version, "550.54");
        assert!(report.attached_gpus.is_empty());
    }

    #[test]
    fn test_parse_newer_power_layout() {
        let xml = "<nvidia_smi_log><gpu id=\"0\"><gpu_power_readings>\
            <power_state>P0</power_state><power_draw>71.32 W</power_draw>\
            <current_power_limit>300.00 W</current_power_limit>\
            </gpu_power_readings></gpu></nvidia_smi_log>";
        let report = parse_nvidia_smi_xml(xml);
        let power = &report.devices[0].power;

        assert_eq!(power.state, "P0");
        assert_eq!(power.draw, "71.32 W");
        assert_eq!(power.limit, "300.00 W");
    }

    #[test]
    fn test_parse_unescapes_text() {
        let xml = "<nvidia_smi_log><gpu id=\"0\"><processes><process_info>\
            <process_name>a&amp;b</process_name></process_info></processes></gpu></nvidia_smi_log>";
        let report = parse_nvidia_smi_xml(xml);
        assert_eq!(report.devices[0].processes[0].process_name, "a&b");
    }
}
