// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Target boards
//!
//! A `Board` is the identity of one device (name + FQBN) plus the serial
//! channel used to reach it. `BoardRecord` is its flat JSON form, shared by
//! the remote wire format and project files:
//!
//! ```json
//! {"name": "uno", "fqbn": "arduino:avr:uno", "port": "/dev/ttyUSB0",
//!  "serial": {"baudrate": 115200, "timeout": 0.1, "encoding": "utf-8", "autostrip": true}}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::serial::{suggest_port, SerialChannel, SerialConfig, SerialOptions};

pub mod catalog;

pub use catalog::{lookup, DEFAULT_BOARD, SUPPORTED_BOARDS};

/// Serializable board description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardRecord {
    pub name: String,
    pub fqbn: String,
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub serial: SerialConfig,
}

/// Partial board reconfiguration; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardOptions {
    pub name: Option<String>,
    pub fqbn: Option<String>,
    pub port: Option<String>,
    pub serial: Option<SerialOptions>,
}

/// One target device and its serial line
#[derive(Debug)]
pub struct Board {
    name: String,
    fqbn: String,
    serial: SerialChannel,
}

impl Board {
    pub fn new(name: impl Into<String>, fqbn: impl Into<String>, port: Option<String>) -> Self {
        Self::with_channel(name, fqbn, port, SerialChannel::new())
    }

    /// Build a board around an existing (closed) channel
    pub fn with_channel(
        name: impl Into<String>,
        fqbn: impl Into<String>,
        port: Option<String>,
        mut serial: SerialChannel,
    ) -> Self {
        if port.is_some() {
            serial.configure(&SerialOptions {
                port,
                ..Default::default()
            });
        }
        Self {
            name: name.into(),
            fqbn: fqbn.into(),
            serial,
        }
    }

    /// Select a supported board by name, auto-suggesting a port.
    pub fn select(name: &str) -> Result<Self> {
        let (name, fqbn) = catalog::lookup(name)?;
        let port = suggest_port();
        match &port {
            Some(port) => tracing::info!("selected {} on {}", name, port),
            None => tracing::info!("selected {} (no serial port detected)", name),
        }
        Ok(Self::new(name, fqbn, port))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fqbn(&self) -> &str {
        &self.fqbn
    }

    /// Target port; `None` until resolved
    pub fn port(&self) -> Option<&str> {
        self.serial.port()
    }

    pub fn serial(&self) -> &SerialChannel {
        &self.serial
    }

    pub fn configure(&mut self, options: &BoardOptions) {
        if let Some(name) = &options.name {
            self.name = name.clone();
        }
        if let Some(fqbn) = &options.fqbn {
            self.fqbn = fqbn.clone();
        }
        if let Some(serial) = &options.serial {
            self.serial.configure(serial);
        }
        if options.port.is_some() {
            self.serial.configure(&SerialOptions {
                port: options.port.clone(),
                ..Default::default()
            });
        }
    }

    pub fn to_record(&self) -> BoardRecord {
        BoardRecord {
            name: self.name.clone(),
            fqbn: self.fqbn.clone(),
            port: self.port().map(str::to_string),
            serial: self.serial.config().clone(),
        }
    }

    pub fn from_record(record: &BoardRecord) -> Self {
        let mut board = Self::new(record.name.clone(), record.fqbn.clone(), None);
        board.apply_record(record);
        board
    }

    /// Overwrite identity and serial settings from a record, keeping the channel.
    pub fn apply_record(&mut self, record: &BoardRecord) {
        let mut serial = SerialOptions::from_config(&record.serial);
        serial.port = Some(record.port.clone().unwrap_or_default());
        self.configure(&BoardOptions {
            name: Some(record.name.clone()),
            fqbn: Some(record.fqbn.clone()),
            port: None,
            serial: Some(serial),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_has_default_serial() {
        let board = Board::new("uno", "arduino:avr:uno", Some("/dev/ttyUSB0".to_string()));
        assert_eq!(board.name(), "uno");
        assert_eq!(board.fqbn(), "arduino:avr:uno");
        assert_eq!(board.port(), Some("/dev/ttyUSB0"));
        assert_eq!(board.serial().config(), &SerialConfig::default());
    }

    #[test]
    fn test_configure_port_and_serial() {
        let mut board = Board::new("uno", "arduino:avr:uno", None);
        board.configure(&BoardOptions {
            port: Some("COM5".to_string()),
            serial: Some(SerialOptions {
                baudrate: Some(9600),
                ..Default::default()
            }),
            ..Default::default()
        });
        assert_eq!(board.port(), Some("COM5"));
        assert_eq!(board.serial().config().baudrate, 9600);
        assert_eq!(board.name(), "uno");
    }

    #[test]
    fn test_record_round_trip() {
        let mut board = Board::new("nano", "arduino:avr:nano", Some("/dev/ttyACM0".to_string()));
        board.configure(&BoardOptions {
            serial: Some(SerialOptions {
                timeout: Some(0.5),
                encoding: Some("latin-1".to_string()),
                autostrip: Some(false),
                ..Default::default()
            }),
            ..Default::default()
        });
        let record = board.to_record();
        let restored = Board::from_record(&record);
        assert_eq!(restored.to_record(), record);
    }

    #[test]
    fn test_record_json_shape() {
        let board = Board::new("uno", "arduino:avr:uno", Some("/dev/ttyUSB0".to_string()));
        let json = serde_json::to_value(board.to_record()).unwrap();
        assert_eq!(json["name"], "uno");
        assert_eq!(json["fqbn"], "arduino:avr:uno");
        assert_eq!(json["port"], "/dev/ttyUSB0");
        assert_eq!(json["serial"]["baudrate"], 115200);
        assert_eq!(json["serial"]["timeout"], 0.1);
        assert_eq!(json["serial"]["encoding"], "utf-8");
        assert_eq!(json["serial"]["autostrip"], true);
    }

    #[test]
    fn test_record_without_port_serializes_null() {
        let board = Board::new("uno", "arduino:avr:uno", None);
        let json = serde_json::to_value(board.to_record()).unwrap();
        assert!(json["port"].is_null());
    }

    #[test]
    fn test_apply_record_clears_port() {
        let mut board = Board::new("uno", "arduino:avr:uno", Some("COM3".to_string()));
        let record = BoardRecord {
            name: "nano".to_string(),
            fqbn: "arduino:avr:nano".to_string(),
            port: None,
            serial: SerialConfig::default(),
        };
        board.apply_record(&record);
        assert_eq!(board.port(), None);
        assert_eq!(board.name(), "nano");
    }
}
