// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Working session
//!
//! A `Session` is the explicit context every command runs against: the
//! selected board, the code store, the bridge and the open project.
//! Serial helpers acquire the port for one operation and release it
//! afterwards, even when the operation fails.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::board::{Board, BoardOptions};
use crate::bridge::Bridge;
use crate::code::CodeSectionStore;
use crate::error::{BridgeError, Result};
use crate::project::Project;

pub struct Session {
    board: Board,
    code: CodeSectionStore,
    bridge: Bridge,
    project: Option<Project>,
    projects_dir: PathBuf,
}

impl Session {
    pub fn new(bridge: Bridge, board: Board, projects_dir: impl Into<PathBuf>) -> Self {
        Self {
            board,
            code: CodeSectionStore::new(),
            bridge,
            project: None,
            projects_dir: projects_dir.into(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn code(&self) -> &CodeSectionStore {
        &self.code
    }

    pub fn code_mut(&mut self) -> &mut CodeSectionStore {
        &mut self.code
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn projects_dir(&self) -> &Path {
        &self.projects_dir
    }

    fn require_project(&self) -> Result<&Project> {
        self.project.as_ref().ok_or_else(|| {
            BridgeError::Config("No project is open. Initialize or load a project first.".to_string())
        })
    }

    /// Create a new project with an empty code store and save it.
    pub fn init_project(&mut self, name: &str) -> Result<PathBuf> {
        let project = Project::new(&self.projects_dir, name)?;
        if project.exists() {
            return Err(BridgeError::InvalidArgument(format!(
                "Project '{}' already exists",
                project.name()
            )));
        }
        self.code.clear();
        let dir = project.save(&self.board, &self.code)?;
        tracing::info!(target: "sketchbridge.session", "initialized project {}", project.name());
        self.project = Some(project);
        Ok(dir)
    }

    /// Open an existing project, restoring its board and code.
    pub fn load_project(&mut self, name: &str) -> Result<()> {
        let project = Project::new(&self.projects_dir, name)?;
        if !project.exists() {
            return Err(BridgeError::InvalidArgument(format!(
                "Project '{}' does not exist",
                project.name()
            )));
        }
        let record = project.load()?;
        self.board.apply_record(&record.board);
        self.code = record.code;
        tracing::debug!(target: "sketchbridge.session", "loaded project {}", project.name());
        self.project = Some(project);
        Ok(())
    }

    /// Write the sketch and project file. Returns the project directory.
    pub fn save_project(&self) -> Result<PathBuf> {
        self.require_project()?.save(&self.board, &self.code)
    }

    /// Delete the project from disk and clear the code store.
    pub fn delete_project(&mut self) -> Result<()> {
        let project = self.require_project()?;
        project.delete()?;
        tracing::info!(target: "sketchbridge.session", "deleted project {}", project.name());
        self.project = None;
        self.code.clear();
        Ok(())
    }

    /// Switch to a supported board by name. The old board's port is closed.
    pub fn select_board(&mut self, name: &str) -> Result<()> {
        let board = Board::select(name)?;
        self.board.serial().close();
        self.board = board;
        Ok(())
    }

    pub fn configure_board(&mut self, options: &BoardOptions) {
        self.board.configure(options);
    }

    pub fn add_code(&mut self, section: &str, cell_id: &str, text: &str) -> Result<()> {
        self.code.add_code(section, cell_id, text)
    }

    pub fn remove_code(&mut self, section: &str, cell_id: Option<&str>) -> Result<()> {
        self.code.remove_code(section, cell_id)
    }

    /// Generated sketch source for the current code
    pub fn show(&self) -> String {
        self.code.generate()
    }

    /// Save, then compile the project directory, logging to `logs/compile.log`.
    pub async fn compile(&self, extra_args: &[String]) -> Result<bool> {
        let project = self.require_project()?;
        let dir = project.save(&self.board, &self.code)?;
        let log = project.compile_log();
        self.bridge
            .compile(&self.board, &dir, extra_args, Some(&log))
            .await
    }

    /// Save, then compile and upload, logging to `logs/upload.log`.
    pub async fn upload(&self, extra_args: &[String]) -> Result<bool> {
        let project = self.require_project()?;
        let dir = project.save(&self.board, &self.code)?;
        let log = project.upload_log();
        self.bridge
            .upload(&self.board, &dir, extra_args, Some(&log))
            .await
    }

    pub async fn serial_open(&self) -> Result<()> {
        self.bridge.open_serial(&self.board).await
    }

    pub async fn serial_close(&self) -> Result<()> {
        self.bridge.close_serial(&self.board).await
    }

    async fn release_serial(&self) {
        if let Err(e) = self.bridge.close_serial(&self.board).await {
            tracing::warn!(target: "sketchbridge.session", "failed to close serial port: {}", e);
        }
    }

    /// Read `count` lines (at least one) with the port held for just this call.
    ///
    /// With a `timeout`, giving up closes the port, which also ends a
    /// blocked local read.
    pub async fn serial_read(&self, count: usize, timeout: Option<Duration>) -> Result<Vec<String>> {
        self.serial_open().await?;
        let read = self.bridge.read_lines_serial(&self.board, count);
        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(result) => result,
                Err(_) => Err(BridgeError::Serial(format!(
                    "no {} line(s) received within {:.1}s",
                    count.max(1),
                    limit.as_secs_f64()
                ))),
            },
            None => read.await,
        };
        self.release_serial().await;
        result
    }

    /// Raw bytes; `None` reads everything currently available.
    pub async fn serial_read_bytes(&self, size: Option<usize>) -> Result<Vec<u8>> {
        self.serial_open().await?;
        let result = self.bridge.read_serial(&self.board, size).await;
        self.release_serial().await;
        result
    }

    pub async fn serial_write(&self, data: &str, append_newline: bool) -> Result<usize> {
        self.serial_open().await?;
        let result = self
            .bridge
            .write_serial(&self.board, data, append_newline)
            .await;
        self.release_serial().await;
        result
    }

    /// Listen for `duration` (or until the port closes), forwarding lines to the bridge sink.
    pub async fn serial_listen(&self, duration: Option<Duration>, prefix: Option<&str>) -> Result<()> {
        self.serial_open().await?;
        let result = self.bridge.listen_serial(&self.board, duration, prefix).await;
        self.release_serial().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendResult, MockBackend};
    use crate::bridge::{Mode, OutputSink};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn session(backend: &MockBackend, root: &Path) -> Session {
        let quiet: OutputSink = Arc::new(|_: &str| {});
        let bridge = Bridge::with_backend(Mode::Local, Box::new(backend.clone())).with_sink(quiet);
        let board = Board::new("uno", "arduino:avr:uno", Some("/dev/ttyUSB0".to_string()));
        Session::new(bridge, board, root)
    }

    #[tokio::test]
    async fn test_operations_need_a_project() {
        let temp = TempDir::new().unwrap();
        let session = session(&MockBackend::new(), temp.path());
        assert!(matches!(session.save_project(), Err(BridgeError::Config(_))));
        assert!(matches!(session.compile(&[]).await, Err(BridgeError::Config(_))));
    }

    #[tokio::test]
    async fn test_compile_saves_and_logs() {
        let temp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let mut session = session(&backend, temp.path());
        session.init_project("blink").unwrap();
        session.add_code("loop", "0", "digitalWrite(13, HIGH);").unwrap();

        assert!(session.compile(&[]).await.unwrap());
        let project = session.project().unwrap();
        let sketch = std::fs::read_to_string(project.sketch_path()).unwrap();
        assert!(sketch.contains("\tdigitalWrite(13, HIGH);"));
        assert!(project.compile_log().exists());
        assert_eq!(backend.calls()[0].sketch.as_deref(), Some(project.dir()));
    }

    #[tokio::test]
    async fn test_failed_compile_skips_upload() {
        let temp = TempDir::new().unwrap();
        let backend = MockBackend::new().with_compile_result(BackendResult::failed("error"));
        let mut session = session(&backend, temp.path());
        session.init_project("blink").unwrap();

        assert!(!session.upload(&[]).await.unwrap());
        assert_eq!(backend.operations(), vec!["compile"]);
        assert!(session.project().unwrap().upload_log().exists());
    }

    #[tokio::test]
    async fn test_serial_read_releases_port() {
        let temp = TempDir::new().unwrap();
        let backend = MockBackend::new().with_lines(["hello"]);
        let session = session(&backend, temp.path());

        assert_eq!(session.serial_read(1, None).await.unwrap(), vec!["hello"]);
        assert!(session.serial_read(1, None).await.is_err());
        assert_eq!(
            backend.operations(),
            vec![
                "open_serial",
                "read_lines_serial",
                "close_serial",
                "open_serial",
                "read_lines_serial",
                "close_serial"
            ]
        );
        assert!(!backend.is_open());
    }

    #[tokio::test]
    async fn test_serial_read_bytes_goes_through_backend() {
        let temp = TempDir::new().unwrap();
        let backend = MockBackend::new().with_bytes(b"OK\r\nrest");
        let session = session(&backend, temp.path());

        assert_eq!(session.serial_read_bytes(Some(4)).await.unwrap(), b"OK\r\n");
        assert_eq!(session.serial_read_bytes(None).await.unwrap(), b"rest");
        assert_eq!(backend.call_count("read_serial"), 2);
        assert_eq!(backend.call_count("close_serial"), 2);
        assert!(!backend.is_open());
    }

    #[tokio::test]
    async fn test_failed_upload_is_logged() {
        let temp = TempDir::new().unwrap();
        let backend =
            MockBackend::new().with_upload_result(BackendResult::failed("avrdude: stk500_recv(): not responding"));
        let mut session = session(&backend, temp.path());
        session.init_project("blink").unwrap();

        assert!(!session.upload(&[]).await.unwrap());
        assert_eq!(backend.operations(), vec!["compile", "upload"]);
        let log = std::fs::read_to_string(session.project().unwrap().upload_log()).unwrap();
        assert!(log.contains("| FAIL |"));
    }

    #[test]
    fn test_init_existing_project_fails() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&MockBackend::new(), temp.path());
        session.init_project("blink").unwrap();
        assert!(matches!(
            session.init_project("blink"),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_load_restores_board_and_code() {
        let temp = TempDir::new().unwrap();
        let backend = MockBackend::new();
        let mut first = session(&backend, temp.path());
        first.init_project("weather").unwrap();
        first.configure_board(&BoardOptions {
            port: Some("COM7".to_string()),
            ..Default::default()
        });
        first.add_code("globals", "a", "float t;").unwrap();
        first.save_project().unwrap();

        let mut second = session(&backend, temp.path());
        second.load_project("weather").unwrap();
        assert_eq!(second.board().port(), Some("COM7"));
        assert_eq!(second.code().get_section("globals").unwrap(), vec!["float t;"]);

        assert!(matches!(
            second.load_project("missing"),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_delete_project_clears_state() {
        let temp = TempDir::new().unwrap();
        let mut session = session(&MockBackend::new(), temp.path());
        let dir = session.init_project("gone").unwrap();
        session.add_code("setup", "0", "x();").unwrap();
        session.delete_project().unwrap();
        assert!(!dir.exists());
        assert!(session.project().is_none());
        assert!(session.code().is_empty());
    }
}
