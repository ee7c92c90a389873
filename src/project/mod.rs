// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Project persistence
//!
//! A project is one directory under the projects root:
//!
//! ```text
//! <projects>/<name>/
//!     <name>.ino      generated sketch
//!     <name>.json     ProjectRecord
//!     logs/compile.log
//!     logs/upload.log
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::board::{Board, BoardRecord};
use crate::code::CodeSectionStore;
use crate::error::{BridgeError, Result};

pub const DEFAULT_PROJECT_NAME: &str = "sketch";
pub const DEFAULT_PROJECTS_DIR: &str = "./projects";
const LOGS_DIR: &str = "logs";

/// Persisted project file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_name: String,
    pub project_dir: PathBuf,
    pub ino_file: PathBuf,
    pub board: BoardRecord,
    #[serde(default)]
    pub code: CodeSectionStore,
}

/// Paths of one named project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    name: String,
    dir: PathBuf,
}

impl Project {
    /// Resolve `<projects_dir>/<name>` as an absolute path. Does not touch the disk.
    pub fn new(projects_dir: &Path, name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(|c: char| c == '/' || c == '\\')
        {
            return Err(BridgeError::InvalidArgument(format!(
                "Invalid project name '{}'",
                name
            )));
        }
        let root = if projects_dir.is_absolute() {
            projects_dir.to_path_buf()
        } else {
            std::env::current_dir()?.join(projects_dir)
        };
        Ok(Self {
            name: name.to_string(),
            dir: root.join(name),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn sketch_path(&self) -> PathBuf {
        self.dir.join(format!("{}.ino", self.name))
    }

    pub fn record_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.name))
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.dir.join(LOGS_DIR)
    }

    pub fn compile_log(&self) -> PathBuf {
        self.logs_dir().join("compile.log")
    }

    pub fn upload_log(&self) -> PathBuf {
        self.logs_dir().join("upload.log")
    }

    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    /// Create the project and log directories.
    pub fn init(&self) -> Result<()> {
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }

    pub fn to_record(&self, board: &Board, code: &CodeSectionStore) -> ProjectRecord {
        ProjectRecord {
            project_name: self.name.clone(),
            project_dir: self.dir.clone(),
            ino_file: self.sketch_path(),
            board: board.to_record(),
            code: code.clone(),
        }
    }

    /// Write the generated sketch and the project file. Returns the project directory.
    pub fn save(&self, board: &Board, code: &CodeSectionStore) -> Result<PathBuf> {
        self.init()?;
        std::fs::write(self.sketch_path(), code.generate())?;
        let record = serde_json::to_string_pretty(&self.to_record(board, code))?;
        std::fs::write(self.record_path(), record)?;
        tracing::debug!(target: "sketchbridge.session", "saved project {} to {}", self.name, self.dir.display());
        Ok(self.dir.clone())
    }

    pub fn load(&self) -> Result<ProjectRecord> {
        let path = self.record_path();
        let content = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BridgeError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Project '{}' has no project file at {}", self.name, path.display()),
                ))
            } else {
                BridgeError::Io(e)
            }
        })?;

        // code is imported on its own so unknown sections surface as InvalidSections
        let mut value: serde_json::Value = serde_json::from_str(&content)?;
        let code = value.as_object_mut().and_then(|fields| fields.remove("code"));
        let mut record: ProjectRecord = serde_json::from_value(value)?;
        if let Some(code) = code.filter(|c| !c.is_null()) {
            record.code.import_from_json(&code)?;
        }
        Ok(record)
    }

    /// Remove the project directory and everything in it. Missing is fine.
    pub fn delete(&self) -> Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}
