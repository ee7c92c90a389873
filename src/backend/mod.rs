// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Build backends
//!
//! A backend performs compile, upload and serial I/O against a `Board`. The
//! same trait is implemented by [`LocalBackend`] (build tool subprocess and
//! direct serial access) and [`RemoteBackend`] (stateless HTTP calls to an
//! agent that owns the board).

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::error::Result;

pub mod local;
pub mod mock;
pub mod payload;
pub mod remote;
pub mod toolchain;

pub use local::LocalBackend;
pub use mock::MockBackend;
pub use remote::RemoteBackend;

/// Outcome of a compile or upload, identical for every backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendResult {
    /// Tool exit status was zero
    #[serde(rename = "status")]
    pub success: bool,

    #[serde(default)]
    pub stdout: String,

    #[serde(default)]
    pub stderr: String,

    /// Command line that produced the result, when the backend knows it
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
}

impl BackendResult {
    pub fn succeeded(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stderr: stderr.into(),
            ..Default::default()
        }
    }
}

/// Operations every backend must provide
#[async_trait]
pub trait BuildBackend: Send + Sync {
    /// Short backend name for logs ("local", "remote")
    fn name(&self) -> &str;

    /// Compile the sketch at `sketch` (a directory, or a single sketch file)
    async fn compile(
        &self,
        board: &Board,
        sketch: &Path,
        extra_args: &[String],
    ) -> Result<BackendResult>;

    /// Upload the sketch. Does not compile first.
    async fn upload(
        &self,
        board: &Board,
        sketch: &Path,
        extra_args: &[String],
    ) -> Result<BackendResult>;

    async fn open_serial(&self, board: &Board) -> Result<()>;

    async fn close_serial(&self, board: &Board) -> Result<()>;

    /// Raw bytes; `None` means everything currently available
    async fn read_serial(&self, board: &Board, size: Option<usize>) -> Result<Vec<u8>>;

    /// Block until `count` lines arrived
    async fn read_lines_serial(&self, board: &Board, count: usize) -> Result<Vec<String>>;

    /// Returns bytes written
    async fn write_serial(&self, board: &Board, data: &str, append_newline: bool)
        -> Result<usize>;
}
