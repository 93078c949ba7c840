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

//! Value normalizers shared by the metric catalog
//!
//! nvidia-smi mixes bare numbers (`"3"`), unit-suffixed values (`"250.00 W"`,
//! `"1.5 MiB"`) and free-form text. Each function maps one raw field to a
//! canonical numeric string and never fails: anything it cannot read becomes
//! `"0"`.

use lazy_static::lazy_static;
use regex::Regex;

/// Sentinel nvidia-smi prints for a value it cannot measure
pub const PLACEHOLDER: &str = "N/A";

lazy_static! {
    pub static ref NON_NUMERIC_RE: Regex = Regex::new(r"[^0-9.]").unwrap();
    pub static ref UNIT_VALUE_RE: Regex =
        Regex::new(r"(?P<value>[\d.]+)\s*(?P<power>[KMGT]i?)?(?P<unit>.*)").unwrap();
    pub static ref VERSION_RE: Regex = Regex::new(r"(?P<version>\d+\.\d+)").unwrap();
}

/// Strip everything except digits and decimal points
///
/// Used for plain counts, percentages and enumerated codes such as `"P8"`.
///
/// # Arguments
/// * `value` - Raw field value
///
/// # Returns
/// * The numeric remainder, or `"0"` when nothing parseable is left
pub fn numeric_strip(value: &str) -> String {
    if value.trim() == PLACEHOLDER {
        return "0".to_string();
    }

    let digits = NON_NUMERIC_RE.replace_all(value, "");
    if digits.parse::<f64>().is_ok() {
        digits.into_owned()
    } else {
        "0".to_string()
    }
}

/// Scale a unit-suffixed value into base units
///
/// Accepts `<number> [prefix]<unit>` where the optional prefix is a decimal
/// (`K`, `M`, `G`, `T`) or binary (`Ki`, `Mi`, `Gi`, `Ti`) magnitude.
///
/// # Arguments
/// * `value` - Raw field value (e.g. `"1500 MHz"`, `"2.5 GiB"`)
///
/// # Returns
/// * The scaled value as a plain decimal string, or `"0"` when unreadable
pub fn unit_scale(value: &str) -> String {
    if value.trim() == PLACEHOLDER {
        return "0".to_string();
    }

    let Some(captures) = UNIT_VALUE_RE.captures(value) else {
        return "0".to_string();
    };

    let Ok(number) = captures["value"].parse::<f64>() else {
        return "0".to_string();
    };

    let multiplier = match captures.name("power").map(|m| m.as_str()) {
        Some("K") => 1e3,
        Some("M") => 1e6,
        Some("G") => 1e9,
        Some("T") => 1e12,
        Some("Ki") => 1024.0,
        Some("Mi") => 1024.0_f64.powi(2),
        Some("Gi") => 1024.0_f64.powi(3),
        Some("Ti") => 1024.0_f64.powi(4),
        _ => 1.0,
    };

    format_decimal(number * multiplier)
}

/// Extract the leading `<major>.<minor>` of a version string
///
/// # Arguments
/// * `value` - Raw version (e.g. `"460.32.03"`)
///
/// # Returns
/// * `"460.32"`, or `"0"` when no such pattern exists
pub fn version_extract(value: &str) -> String {
    VERSION_RE
        .captures(value)
        .map(|c| c["version"].to_string())
        .unwrap_or_else(|| "0".to_string())
}

/// Map an on/off style field to `"1"` or `"0"`
pub fn flag(value: &str) -> String {
    if parse_boolean(value).unwrap_or(false) {
        "1".to_string()
    } else {
        "0".to_string()
    }
}

/// Parse boolean-like strings to actual booleans
///
/// # Arguments
/// * `value` - String value (e.g. "On", "Enabled", "Active")
///
/// # Returns
/// * `Ok(bool)` - Parsed boolean value
/// * `Err(String)` - Parse error
pub fn parse_boolean(value: &str) -> Result<bool, String> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "true" | "1" | "on" | "enabled" | "active" => Ok(true),
        "no" | "false" | "0" | "off" | "disabled" | "inactive" | "not active" => Ok(false),
        _ => Err(format!("Cannot parse '{value}' as boolean")),
    }
}

/// Render a float without exponent or a trailing `.0`
fn format_decimal(value: f64) -> String {
    if value.is_finite() {
        format!("{value}")
    } else {
        "0".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_is_zero() {
        assert_eq!(numeric_strip("N/A"), "0");
        assert_eq!(unit_scale("N/A"), "0");
        assert_eq!(version_extract("N/A"), "0");
        assert_eq!(flag("N/A"), "0");
    }

    #[test]
    fn test_numeric_strip() {
        assert_eq!(numeric_strip("73 %"), "73");
        assert_eq!(numeric_strip("12.5"), "12.5");
        assert_eq!(numeric_strip("P8"), "8");
        assert_eq!(numeric_strip("16x"), "16");
        assert_eq!(numeric_strip("Enabled"), "0");
        assert_eq!(numeric_strip(""), "0");
        assert_eq!(numeric_strip("1.2.3"), "0");
    }

    #[test]
    fn test_unit_scale_decimal_prefixes() {
        assert_eq!(unit_scale("1 KB"), "1000");
        assert_eq!(unit_scale("1500 MHz"), "1500000000");
        assert_eq!(unit_scale("2 GB/s"), "2000000000");
        assert_eq!(unit_scale("1 TB"), "1000000000000");
    }

    #[test]
    fn test_unit_scale_binary_prefixes() {
        assert_eq!(unit_scale("1 KiB"), "1024");
        assert_eq!(unit_scale("1.5 MiB"), "1572864");
        assert_eq!(unit_scale("2.5 GiB"), "2684354560");
        assert_eq!(unit_scale("24576 MiB"), "25769803776");
    }

    #[test]
    fn test_unit_scale_without_prefix() {
        assert_eq!(unit_scale("300 W"), "300");
        assert_eq!(unit_scale("250.50 W"), "250.5");
        assert_eq!(unit_scale("45 C"), "45");
        assert_eq!(unit_scale("30 %"), "30");
        assert_eq!(unit_scale("0"), "0");
    }

    #[test]
    fn test_unit_scale_unreadable() {
        assert_eq!(unit_scale(""), "0");
        assert_eq!(unit_scale("Default"), "0");
        assert_eq!(unit_scale("..."), "0");
    }

    #[test]
    fn test_version_extract() {
        assert_eq!(version_extract("460.32.03"), "460.32");
        assert_eq!(version_extract("11.5"), "11.5");
        assert_eq!(version_extract("CUDA 12.2 (beta)"), "12.2");
        assert_eq!(version_extract(""), "0");
    }

    #[test]
    fn test_flag() {
        assert_eq!(flag("On"), "1");
        assert_eq!(flag("Enabled"), "1");
        assert_eq!(flag("Off"), "0");
        assert_eq!(flag(""), "0");
    }

    #[test]
    fn test_parse_boolean() {
        assert!(parse_boolean("yes").unwrap());
        assert!(!parse_boolean("Not Active").unwrap());
        assert!(parse_boolean("On").unwrap());
        assert!(!parse_boolean("disabled").unwrap());
        assert!(parse_boolean("maybe").is_err());
    }
}
