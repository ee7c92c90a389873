// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for sketchbridge
//!
//! Every public operation either returns a definite result or one of these
//! typed errors. Nothing here is retried automatically.

use thiserror::Error;

/// Main error type for sketchbridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Missing or invalid configuration (mode parameters, unset port before open)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The external build tool could not be resolved
    #[error("Build tool not found: {0}")]
    ToolNotFound(String),

    /// Upload requested for a board without a port
    #[error("No serial port is set for board '{0}'")]
    MissingPort(String),

    /// Serial I/O attempted on a closed channel
    #[error("Serial port is not open")]
    NotOpen,

    /// The OS refused to hand out the serial device
    #[error("Failed to open serial port '{port}': {source}")]
    SerialOpen {
        port: String,
        #[source]
        source: serialport::Error,
    },

    /// Serial device errors after the port was opened
    #[error("Serial error: {0}")]
    Serial(String),

    /// Remote agent transport errors
    #[error("Remote backend error: {0}")]
    Remote(#[from] RemoteError),

    /// Invalid caller-supplied argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Section name outside globals/setup/loop/functions
    #[error("Unknown section: {0}")]
    UnknownSection(String),

    /// Section map with keys other than the four known sections
    #[error("Invalid sections in JSON data: {0}")]
    InvalidSections(String),

    /// Generated source text that cannot be split back into sections
    #[error("Code format error: {0}")]
    Format(String),

    /// Sketch packaging errors
    #[error("Archive error: {0}")]
    Archive(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Transport-level failures talking to the remote agent.
///
/// Each variant keeps the endpoint path and the original cause.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Request could not be sent or the body could not be read
    #[error("request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// Request exceeded the client timeout
    #[error("request to {path} timed out")]
    Timeout { path: String },

    /// Agent answered with a non-success status
    #[error("{path} returned HTTP {status}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },

    /// Agent answered with a body that is not the expected JSON
    #[error("invalid response from {path}: {source}")]
    InvalidResponse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Agent answered with JSON that carries an undecodable payload
    #[error("invalid payload from {path}: {message}")]
    InvalidPayload { path: String, message: String },
}

impl RemoteError {
    /// Classify a reqwest failure for the given endpoint.
    pub fn from_reqwest(path: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RemoteError::Timeout {
                path: path.to_string(),
            }
        } else {
            RemoteError::Request {
                path: path.to_string(),
                source: err,
            }
        }
    }

    /// Endpoint path the failure belongs to
    pub fn path(&self) -> &str {
        match self {
            RemoteError::Request { path, .. }
            | RemoteError::Timeout { path }
            | RemoteError::Status { path, .. }
            | RemoteError::InvalidResponse { path, .. }
            | RemoteError::InvalidPayload { path, .. } => path,
        }
    }
}

/// Result type alias for sketchbridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<zip::result::ZipError> for BridgeError {
    fn from(err: zip::result::ZipError) -> Self {
        BridgeError::Archive(err.to_string())
    }
}

impl From<walkdir::Error> for BridgeError {
    fn from(err: walkdir::Error) -> Self {
        BridgeError::Archive(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = BridgeError::Config("token missing".to_string());
        assert_eq!(err.to_string(), "Configuration error: token missing");
    }

    #[test]
    fn test_missing_port_names_board() {
        let err = BridgeError::MissingPort("uno".to_string());
        assert!(err.to_string().contains("'uno'"));
    }

    #[test]
    fn test_not_open_display() {
        assert_eq!(BridgeError::NotOpen.to_string(), "Serial port is not open");
    }

    #[test]
    fn test_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BridgeError = io_err.into();
        assert!(matches!(err, BridgeError::Io(_)));
    }

    #[test]
    fn test_remote_status_wraps_into_bridge_error() {
        let err: BridgeError = RemoteError::Status {
            path: "/compile".to_string(),
            status: 401,
            message: "Invalid or missing API token.".to_string(),
        }
        .into();
        let text = err.to_string();
        assert!(text.contains("Remote backend error"));
        assert!(text.contains("/compile"));
        assert!(text.contains("401"));
    }

    #[test]
    fn test_remote_invalid_response_keeps_source() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err = RemoteError::InvalidResponse {
            path: "/serial/read".to_string(),
            source: json_err,
        };
        assert_eq!(err.path(), "/serial/read");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_from_zip_error() {
        let err: BridgeError = zip::result::ZipError::FileNotFound.into();
        assert!(matches!(err, BridgeError::Archive(_)));
    }
}
