// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Bridge façade
//!
//! Picks a backend for the current mode and adds what every caller needs on
//! top of it: compile-before-upload sequencing, progress output, run logs and
//! a listen loop built from single-line reads.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::backend::remote::DEFAULT_REQUEST_TIMEOUT;
use crate::backend::{BackendResult, BuildBackend, LocalBackend, RemoteBackend};
use crate::board::Board;
use crate::error::{BridgeError, Result};

pub mod run_log;

/// Where user-facing progress text goes
pub type OutputSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Sink that prints to stdout
pub fn stdout_sink() -> OutputSink {
    Arc::new(|text: &str| println!("{}", text))
}

/// Backend selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Local,
    Remote,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Local => write!(f, "local"),
            Mode::Remote => write!(f, "remote"),
        }
    }
}

impl FromStr for Mode {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Mode::Local),
            "remote" => Ok(Mode::Remote),
            other => Err(BridgeError::Config(format!(
                "Invalid mode '{}'. Use 'local' or 'remote'.",
                other
            ))),
        }
    }
}

/// Parameters for constructing a backend
#[derive(Debug, Clone, PartialEq)]
pub struct ModeOptions {
    pub remote_url: Option<String>,
    pub token: Option<String>,
    /// Explicit build tool location for local mode
    pub tool_path: Option<PathBuf>,
    pub request_timeout: Duration,
}

impl Default for ModeOptions {
    fn default() -> Self {
        Self {
            remote_url: None,
            token: None,
            tool_path: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn create_backend(mode: Mode, options: &ModeOptions) -> Result<Box<dyn BuildBackend>> {
    match mode {
        Mode::Local => Ok(Box::new(LocalBackend::new(options.tool_path.clone())?)),
        Mode::Remote => {
            let url = non_empty(options.remote_url.as_deref()).ok_or_else(|| {
                BridgeError::Config("A remote URL must be provided for remote mode.".to_string())
            })?;
            let token = non_empty(options.token.as_deref()).ok_or_else(|| {
                BridgeError::Config("An API token must be provided for remote mode.".to_string())
            })?;
            Ok(Box::new(RemoteBackend::new(url, token, options.request_timeout)?))
        }
    }
}

/// Runs build and serial operations on a board through the active backend
pub struct Bridge {
    mode: Mode,
    backend: Box<dyn BuildBackend>,
    sink: OutputSink,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("mode", &self.mode)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl Bridge {
    pub fn new(mode: Mode, options: &ModeOptions) -> Result<Self> {
        Ok(Self::with_backend(mode, create_backend(mode, options)?))
    }

    /// Use a caller-built backend (tests, custom transports)
    pub fn with_backend(mode: Mode, backend: Box<dyn BuildBackend>) -> Self {
        Self {
            mode,
            backend,
            sink: stdout_sink(),
        }
    }

    pub fn with_sink(mut self, sink: OutputSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Switch mode. On error the current backend stays active.
    pub fn set_mode(&mut self, mode: Mode, options: &ModeOptions) -> Result<()> {
        self.backend = create_backend(mode, options)?;
        self.mode = mode;
        tracing::info!(target: "sketchbridge.bridge", "bridge mode set to {}", mode);
        Ok(())
    }

    fn emit(&self, text: &str) {
        (self.sink)(text);
    }

    fn emit_streams(&self, result: &BackendResult) {
        let stream = if result.success {
            &result.stdout
        } else {
            &result.stderr
        };
        let stream = stream.trim_end();
        if !stream.is_empty() {
            self.emit(stream);
        }
    }

    fn require_dir(dir: &Path) -> Result<()> {
        if dir.is_dir() {
            Ok(())
        } else {
            Err(BridgeError::InvalidArgument(format!(
                "Sketch source '{}' must be a directory",
                dir.display()
            )))
        }
    }

    fn log_run(&self, log_file: Option<&Path>, result: &BackendResult, action: &str) {
        if let Some(path) = log_file {
            run_log::record(path, result, &format!("{} {}", self.backend.name(), action));
        }
    }

    /// Compile the sketch directory. Returns the tool's success flag.
    pub async fn compile(
        &self,
        board: &Board,
        dir: &Path,
        extra_args: &[String],
        log_file: Option<&Path>,
    ) -> Result<bool> {
        Self::require_dir(dir)?;
        self.emit(&format!(
            "Compiling for {} on port {}...",
            board.name(),
            board.port().unwrap_or("N/A")
        ));
        self.emit("This may take a while, please wait...");

        let result = self.backend.compile(board, dir, extra_args).await?;
        self.emit_streams(&result);
        self.emit(if result.success {
            "Compile complete."
        } else {
            "Compile failed."
        });
        self.log_run(log_file, &result, "compile");

        tracing::debug!(
            target: "sketchbridge.bridge",
            "compile {} via {}: {}",
            dir.display(),
            self.backend.name(),
            result.success
        );
        Ok(result.success)
    }

    /// Compile, then upload if the compile succeeded.
    ///
    /// A failed compile returns `Ok(false)` without contacting the backend's
    /// upload. Both runs are recorded in `log_file`.
    pub async fn upload(
        &self,
        board: &Board,
        dir: &Path,
        extra_args: &[String],
        log_file: Option<&Path>,
    ) -> Result<bool> {
        Self::require_dir(dir)?;
        self.emit(&format!(
            "Uploading to {} on port {}...",
            board.name(),
            board.port().unwrap_or("N/A")
        ));

        if !self.compile(board, dir, extra_args, log_file).await? {
            self.emit("Compilation failed, upload aborted.");
            return Ok(false);
        }

        let result = self.backend.upload(board, dir, extra_args).await?;
        self.emit_streams(&result);
        self.emit(if result.success {
            "Upload complete."
        } else {
            "Upload failed."
        });
        self.log_run(log_file, &result, "upload");
        Ok(result.success)
    }

    pub async fn open_serial(&self, board: &Board) -> Result<()> {
        self.backend.open_serial(board).await
    }

    pub async fn close_serial(&self, board: &Board) -> Result<()> {
        self.backend.close_serial(board).await
    }

    pub async fn read_serial(&self, board: &Board, size: Option<usize>) -> Result<Vec<u8>> {
        self.backend.read_serial(board, size).await
    }

    pub async fn read_lines_serial(&self, board: &Board, count: usize) -> Result<Vec<String>> {
        self.backend.read_lines_serial(board, count).await
    }

    pub async fn write_serial(
        &self,
        board: &Board,
        data: &str,
        append_newline: bool,
    ) -> Result<usize> {
        self.backend.write_serial(board, data, append_newline).await
    }

    /// Forward lines from the board to the sink.
    ///
    /// Each iteration reads a single line, so this behaves the same over
    /// every backend. Stops when `duration` elapses or the channel is closed.
    /// Empty lines and lines without `prefix` are dropped.
    ///
    /// With a local backend an expired duration leaves the in-flight blocking
    /// read running until a line arrives or the channel is closed.
    pub async fn listen_serial(
        &self,
        board: &Board,
        duration: Option<Duration>,
        prefix: Option<&str>,
    ) -> Result<()> {
        let started = Instant::now();
        loop {
            let read = self.backend.read_lines_serial(board, 1);
            let outcome = match duration {
                Some(limit) => {
                    let remaining = limit.saturating_sub(started.elapsed());
                    if remaining.is_zero() {
                        break;
                    }
                    match tokio::time::timeout(remaining, read).await {
                        Ok(outcome) => outcome,
                        Err(_) => break,
                    }
                }
                None => read.await,
            };

            let lines = match outcome {
                Ok(lines) => lines,
                Err(BridgeError::NotOpen) => {
                    tracing::debug!(target: "sketchbridge.bridge", "listen stopped: channel closed");
                    break;
                }
                Err(e) => return Err(e),
            };

            for line in lines {
                if line.is_empty() || prefix.is_some_and(|p| !line.starts_with(p)) {
                    continue;
                }
                self.emit(&line);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn capture() -> (OutputSink, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let sink: OutputSink = Arc::new(move |text: &str| {
            sink_seen.lock().unwrap().push(text.to_string());
        });
        (sink, seen)
    }

    fn board() -> Board {
        Board::new("uno", "arduino:avr:uno", Some("/dev/ttyUSB0".to_string()))
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(" Remote ".parse::<Mode>().unwrap(), Mode::Remote);
        assert_eq!("local".parse::<Mode>().unwrap(), Mode::Local);
        assert!(matches!("cloud".parse::<Mode>(), Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_remote_mode_requires_url_and_token() {
        let missing_token = ModeOptions {
            remote_url: Some("http://agent:5000".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            Bridge::new(Mode::Remote, &missing_token),
            Err(BridgeError::Config(_))
        ));

        let missing_url = ModeOptions {
            token: Some("secret".to_string()),
            remote_url: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            Bridge::new(Mode::Remote, &missing_url),
            Err(BridgeError::Config(_))
        ));
    }

    #[test]
    fn test_set_mode_failure_keeps_backend() {
        let temp = TempDir::new().unwrap();
        let tool = temp.path().join("arduino-cli");
        std::fs::write(&tool, "").unwrap();
        let local = ModeOptions {
            tool_path: Some(tool),
            ..Default::default()
        };
        let mut bridge = Bridge::new(Mode::Local, &local).unwrap();
        assert!(bridge.set_mode(Mode::Remote, &ModeOptions::default()).is_err());
        assert_eq!(bridge.mode(), Mode::Local);
        assert_eq!(bridge.backend_name(), "local");

        bridge
            .set_mode(
                Mode::Remote,
                &ModeOptions {
                    remote_url: Some("http://agent:5000/".to_string()),
                    token: Some("secret".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(bridge.mode(), Mode::Remote);
        assert_eq!(bridge.backend_name(), "remote");
    }

    #[tokio::test]
    async fn test_compile_rejects_missing_directory() {
        let backend = MockBackend::new();
        let bridge = Bridge::with_backend(Mode::Local, Box::new(backend.clone()));
        let temp = TempDir::new().unwrap();
        let err = bridge
            .compile(&board(), &temp.path().join("missing"), &[], None)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_compile_emits_banners_and_stdout() {
        let (sink, seen) = capture();
        let bridge = Bridge::with_backend(Mode::Local, Box::new(MockBackend::new())).with_sink(sink);
        let temp = TempDir::new().unwrap();
        assert!(bridge.compile(&board(), temp.path(), &[], None).await.unwrap());

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], "Compiling for uno on port /dev/ttyUSB0...");
        assert!(seen.contains(&"Sketch uses 924 bytes.".to_string()));
        assert_eq!(seen.last().unwrap(), "Compile complete.");
    }

    #[tokio::test]
    async fn test_upload_aborts_after_failed_compile() {
        let (sink, seen) = capture();
        let backend = MockBackend::new().with_compile_result(BackendResult::failed("error: x"));
        let bridge = Bridge::with_backend(Mode::Local, Box::new(backend.clone())).with_sink(sink);
        let temp = TempDir::new().unwrap();

        assert!(!bridge.upload(&board(), temp.path(), &[], None).await.unwrap());
        assert_eq!(backend.operations(), vec!["compile"]);
        assert_eq!(
            seen.lock().unwrap().last().unwrap(),
            "Compilation failed, upload aborted."
        );
    }

    #[tokio::test]
    async fn test_upload_runs_after_successful_compile_and_logs_both() {
        let backend = MockBackend::new();
        let (sink, _) = capture();
        let bridge = Bridge::with_backend(Mode::Local, Box::new(backend.clone())).with_sink(sink);
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("logs").join("upload.log");

        assert!(bridge
            .upload(&board(), temp.path(), &[], Some(&log))
            .await
            .unwrap());
        assert_eq!(backend.operations(), vec!["compile", "upload"]);

        let content = std::fs::read_to_string(&log).unwrap();
        assert!(content.contains("| OK | mock compile"));
        assert!(content.contains("| OK | mock upload"));
    }

    #[tokio::test]
    async fn test_backend_error_propagates_without_log() {
        let backend = MockBackend::new().with_tool_missing("arduino-cli missing");
        let (sink, _) = capture();
        let bridge = Bridge::with_backend(Mode::Local, Box::new(backend)).with_sink(sink);
        let temp = TempDir::new().unwrap();
        let log = temp.path().join("compile.log");

        let err = bridge
            .compile(&board(), temp.path(), &[], Some(&log))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ToolNotFound(_)));
        assert!(!log.exists());
    }

    #[tokio::test]
    async fn test_unwritable_log_does_not_change_result() {
        let backend = MockBackend::new();
        let (sink, _) = capture();
        let bridge = Bridge::with_backend(Mode::Local, Box::new(backend)).with_sink(sink);
        let temp = TempDir::new().unwrap();

        // The log path is an existing directory
        assert!(bridge
            .compile(&board(), temp.path(), &[], Some(temp.path()))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_listen_filters_and_stops_on_close() {
        let (sink, seen) = capture();
        let backend = MockBackend::new().with_lines(["T:21", "", "H:40", "T:22"]);
        let bridge = Bridge::with_backend(Mode::Local, Box::new(backend.clone())).with_sink(sink);

        bridge.listen_serial(&board(), None, Some("T:")).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["T:21", "T:22"]);
        assert_eq!(backend.call_count("read_lines_serial"), 5);
    }

    #[tokio::test]
    async fn test_listen_zero_duration_reads_nothing() {
        let backend = MockBackend::new().with_lines(["x"]);
        let (sink, _) = capture();
        let bridge = Bridge::with_backend(Mode::Local, Box::new(backend.clone())).with_sink(sink);
        bridge
            .listen_serial(&board(), Some(Duration::ZERO), None)
            .await
            .unwrap();
        assert_eq!(backend.call_count("read_lines_serial"), 0);
    }
}
