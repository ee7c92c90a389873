// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Serial device enumeration and port suggestion.

use crate::error::{BridgeError, Result};

/// Device names of all serial ports the OS reports (e.g. `/dev/ttyUSB0`, `COM3`).
pub fn list_ports() -> Result<Vec<String>> {
    let ports = serialport::available_ports()
        .map_err(|e| BridgeError::Serial(format!("Failed to list ports: {e}")))?;
    Ok(ports.into_iter().map(|p| p.port_name).collect())
}

/// Pick the most likely board port from a list of device names.
///
/// Prefers the first name containing `usb` or `acm` (case-insensitive), then
/// falls back to the first device. This is a heuristic: on hosts with several
/// boards attached it can pick the wrong one.
pub fn pick_port(names: &[String]) -> Option<String> {
    names
        .iter()
        .find(|name| {
            let lower = name.to_lowercase();
            lower.contains("usb") || lower.contains("acm")
        })
        .or_else(|| names.first())
        .cloned()
}

/// Suggest a port from the devices currently attached, if any.
pub fn suggest_port() -> Option<String> {
    match list_ports() {
        Ok(names) => pick_port(&names),
        Err(e) => {
            tracing::warn!(target: "sketchbridge.serial", "port enumeration failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pick_port_prefers_usb() {
        let ports = names(&["/dev/ttyS0", "/dev/ttyS1", "/dev/ttyUSB0"]);
        assert_eq!(pick_port(&ports), Some("/dev/ttyUSB0".to_string()));
    }

    #[test]
    fn test_pick_port_prefers_acm_case_insensitive() {
        let ports = names(&["COM1", "/dev/ttyACM0"]);
        assert_eq!(pick_port(&ports), Some("/dev/ttyACM0".to_string()));
        let ports = names(&["/dev/cu.Bluetooth", "/dev/cu.USBmodem1101"]);
        assert_eq!(pick_port(&ports), Some("/dev/cu.USBmodem1101".to_string()));
    }

    #[test]
    fn test_pick_port_falls_back_to_first() {
        let ports = names(&["COM3", "COM4"]);
        assert_eq!(pick_port(&ports), Some("COM3".to_string()));
    }

    #[test]
    fn test_pick_port_empty() {
        assert_eq!(pick_port(&[]), None);
    }
}
