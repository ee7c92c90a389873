// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock backend for testing
//!
//! Returns configured build results and scripted serial data without
//! touching a build tool, a device or the network. Every call is recorded.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::{BackendResult, BuildBackend};
use crate::board::Board;
use crate::error::{BridgeError, Result};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub operation: &'static str,
    pub board: String,
    pub sketch: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

#[derive(Default)]
struct MockState {
    compile: BackendResult,
    upload: BackendResult,
    tool_missing: Option<String>,
    lines: VecDeque<String>,
    bytes: Vec<u8>,
    written: Vec<String>,
    open: bool,
    calls: Vec<MockCall>,
}

/// Scriptable `BuildBackend`; clones share state
#[derive(Clone)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Backend whose compile and upload both succeed
    pub fn new() -> Self {
        let state = MockState {
            compile: BackendResult::succeeded("Sketch uses 924 bytes."),
            upload: BackendResult::succeeded("Upload done."),
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_compile_result(self, result: BackendResult) -> Self {
        self.state().compile = result;
        self
    }

    pub fn with_upload_result(self, result: BackendResult) -> Self {
        self.state().upload = result;
        self
    }

    /// Make compile and upload fail as if the build tool were missing
    pub fn with_tool_missing(self, message: impl Into<String>) -> Self {
        self.state().tool_missing = Some(message.into());
        self
    }

    /// Queue lines for `read_lines_serial`. Once drained, reads report `NotOpen`.
    pub fn with_lines<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().lines.extend(lines.into_iter().map(Into::into));
        self
    }

    /// Queue raw bytes for `read_serial`
    pub fn with_bytes(self, bytes: &[u8]) -> Self {
        self.state().bytes.extend_from_slice(bytes);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Operation names in call order
    pub fn operations(&self) -> Vec<&'static str> {
        self.state().calls.iter().map(|c| c.operation).collect()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    /// Text passed to `write_serial`, newline included when requested
    pub fn written(&self) -> Vec<String> {
        self.state().written.clone()
    }

    pub fn is_open(&self) -> bool {
        self.state().open
    }

    fn record(&self, operation: &'static str, board: &Board, sketch: Option<&Path>, extra_args: &[String]) {
        self.state().calls.push(MockCall {
            operation,
            board: board.name().to_string(),
            sketch: sketch.map(Path::to_path_buf),
            extra_args: extra_args.to_vec(),
        });
    }

    fn build_result(&self, pick: impl FnOnce(&MockState) -> BackendResult) -> Result<BackendResult> {
        let state = self.state();
        match &state.tool_missing {
            Some(message) => Err(BridgeError::ToolNotFound(message.clone())),
            None => Ok(pick(&*state)),
        }
    }
}

#[async_trait]
impl BuildBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn compile(
        &self,
        board: &Board,
        sketch: &Path,
        extra_args: &[String],
    ) -> Result<BackendResult> {
        self.record("compile", board, Some(sketch), extra_args);
        self.build_result(|s| s.compile.clone())
    }

    async fn upload(
        &self,
        board: &Board,
        sketch: &Path,
        extra_args: &[String],
    ) -> Result<BackendResult> {
        self.record("upload", board, Some(sketch), extra_args);
        if board.port().is_none() {
            return Err(BridgeError::MissingPort(board.name().to_string()));
        }
        self.build_result(|s| s.upload.clone())
    }

    async fn open_serial(&self, board: &Board) -> Result<()> {
        self.record("open_serial", board, None, &[]);
        self.state().open = true;
        Ok(())
    }

    async fn close_serial(&self, board: &Board) -> Result<()> {
        self.record("close_serial", board, None, &[]);
        self.state().open = false;
        Ok(())
    }

    async fn read_serial(&self, board: &Board, size: Option<usize>) -> Result<Vec<u8>> {
        self.record("read_serial", board, None, &[]);
        let mut state = self.state();
        let n = size.map_or(state.bytes.len(), |n| n.min(state.bytes.len()));
        Ok(state.bytes.drain(..n).collect())
    }

    async fn read_lines_serial(&self, board: &Board, count: usize) -> Result<Vec<String>> {
        self.record("read_lines_serial", board, None, &[]);
        let mut state = self.state();
        if state.lines.is_empty() {
            return Err(BridgeError::NotOpen);
        }
        let n = count.max(1).min(state.lines.len());
        Ok(state.lines.drain(..n).collect())
    }

    async fn write_serial(
        &self,
        board: &Board,
        data: &str,
        append_newline: bool,
    ) -> Result<usize> {
        self.record("write_serial", board, None, &[]);
        let text = if append_newline {
            format!("{}\n", data)
        } else {
            data.to_string()
        };
        let written = text.len();
        self.state().written.push(text);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board() -> Board {
        Board::new("uno", "arduino:avr:uno", Some("COM3".to_string()))
    }

    #[tokio::test]
    async fn test_records_calls_in_order() {
        let backend = MockBackend::new();
        let board = board();
        backend
            .compile(&board, Path::new("/tmp/blink"), &["-v".to_string()])
            .await
            .unwrap();
        backend.open_serial(&board).await.unwrap();

        assert_eq!(backend.operations(), vec!["compile", "open_serial"]);
        let first = &backend.calls()[0];
        assert_eq!(first.sketch.as_deref(), Some(Path::new("/tmp/blink")));
        assert_eq!(first.extra_args, vec!["-v"]);
        assert!(backend.is_open());
    }

    #[tokio::test]
    async fn test_lines_drain_then_not_open() {
        let backend = MockBackend::new().with_lines(["a", "b", "c"]);
        let board = board();
        assert_eq!(backend.read_lines_serial(&board, 2).await.unwrap(), vec!["a", "b"]);
        assert_eq!(backend.read_lines_serial(&board, 5).await.unwrap(), vec!["c"]);
        assert!(matches!(
            backend.read_lines_serial(&board, 1).await,
            Err(BridgeError::NotOpen)
        ));
    }

    #[tokio::test]
    async fn test_tool_missing() {
        let backend = MockBackend::new().with_tool_missing("arduino-cli missing");
        let err = backend
            .compile(&board(), Path::new("x"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ToolNotFound(_)));
    }
}
