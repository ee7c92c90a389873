// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Local backend
//!
//! Runs the build tool as a subprocess and talks to the board's serial
//! channel directly. Blocking serial reads and writes run on the blocking pool.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::toolchain::{resolve_tool, ToolSearch};
use super::{BackendResult, BuildBackend};
use crate::board::Board;
use crate::error::{BridgeError, Result};

/// Backend that drives the build tool and serial devices on this machine
pub struct LocalBackend {
    tool: PathBuf,
}

impl LocalBackend {
    /// Locate the build tool now. Fails with `ToolNotFound` when it is missing.
    pub fn new(tool_path: Option<PathBuf>) -> Result<Self> {
        let tool = resolve_tool(tool_path.as_deref())?;
        Ok(Self::with_tool(tool))
    }

    /// Resolve with explicit search inputs instead of the process environment.
    pub fn from_search(search: &ToolSearch) -> Result<Self> {
        Ok(Self::with_tool(search.resolve()?))
    }

    fn with_tool(tool: PathBuf) -> Self {
        tracing::debug!(target: "sketchbridge.local", "local backend using {}", tool.display());
        Self { tool }
    }

    pub fn tool_path(&self) -> &Path {
        &self.tool
    }

    /// Run one tool invocation and capture its streams.
    async fn run(&self, args: Vec<String>) -> Result<BackendResult> {
        let tool = &self.tool;
        let mut command_line = Vec::with_capacity(args.len() + 1);
        command_line.push(tool.display().to_string());
        command_line.extend(args.iter().cloned());

        tracing::debug!(target: "sketchbridge.local", "running {}", command_line.join(" "));

        let output = Command::new(tool)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                BridgeError::ToolNotFound(format!("failed to run {}: {}", tool.display(), e))
            })?;

        let result = BackendResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            command: command_line,
        };
        if !result.success {
            tracing::info!(
                target: "sketchbridge.local",
                "{} exited with {}",
                tool.display(),
                output.status
            );
        }
        Ok(result)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn join_error(err: tokio::task::JoinError) -> BridgeError {
    BridgeError::Serial(format!("serial worker failed: {}", err))
}

#[async_trait]
impl BuildBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn compile(
        &self,
        board: &Board,
        sketch: &Path,
        extra_args: &[String],
    ) -> Result<BackendResult> {
        let mut args = vec![
            "compile".to_string(),
            absolute(sketch)?.display().to_string(),
            "-b".to_string(),
            board.fqbn().to_string(),
        ];
        args.extend(extra_args.iter().cloned());
        self.run(args).await
    }

    async fn upload(
        &self,
        board: &Board,
        sketch: &Path,
        extra_args: &[String],
    ) -> Result<BackendResult> {
        let port = board
            .port()
            .ok_or_else(|| BridgeError::MissingPort(board.name().to_string()))?;
        let mut args = vec![
            "upload".to_string(),
            absolute(sketch)?.display().to_string(),
            "-p".to_string(),
            port.to_string(),
            "-b".to_string(),
            board.fqbn().to_string(),
        ];
        args.extend(extra_args.iter().cloned());
        self.run(args).await
    }

    async fn open_serial(&self, board: &Board) -> Result<()> {
        board.serial().open()
    }

    async fn close_serial(&self, board: &Board) -> Result<()> {
        board.serial().close();
        Ok(())
    }

    async fn read_serial(&self, board: &Board, size: Option<usize>) -> Result<Vec<u8>> {
        let channel = board.serial().clone();
        tokio::task::spawn_blocking(move || channel.read_bytes(size))
            .await
            .map_err(join_error)?
    }

    async fn read_lines_serial(&self, board: &Board, count: usize) -> Result<Vec<String>> {
        let channel = board.serial().clone();
        tokio::task::spawn_blocking(move || channel.read_lines(count))
            .await
            .map_err(join_error)?
    }

    async fn write_serial(
        &self,
        board: &Board,
        data: &str,
        append_newline: bool,
    ) -> Result<usize> {
        let channel = board.serial().clone();
        let data = data.to_string();
        tokio::task::spawn_blocking(move || channel.write(&data, append_newline))
            .await
            .map_err(join_error)?
    }
}
