// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Build tool discovery
//!
//! Search order: explicit path (argument or `ARDUINO_CLI`), then `PATH`,
//! then a copy bundled in a `tools/` directory next to the running
//! executable. The bundled copy is extracted to a temp directory and marked
//! executable on Unix.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{BridgeError, Result};

/// Executable name of the build tool
pub const TOOL_NAME: &str = if cfg!(target_os = "windows") {
    "arduino-cli.exe"
} else {
    "arduino-cli"
};

/// Environment variable consulted when no explicit path is given
pub const TOOL_ENV_VAR: &str = "ARDUINO_CLI";

const BUNDLED_DIR: &str = "tools";
const EXTRACT_DIR: &str = "sketchbridge";

/// Inputs for one resolution pass
#[derive(Debug, Clone, Default)]
pub struct ToolSearch {
    /// Explicit or environment-provided path
    pub explicit: Option<PathBuf>,
    /// Value of `PATH`
    pub path_var: Option<OsString>,
    /// Location of a bundled binary
    pub bundled: Option<PathBuf>,
    /// Where the bundled binary gets extracted
    pub extract_dir: PathBuf,
}

impl ToolSearch {
    /// Search inputs taken from the process environment.
    pub fn from_env(explicit: Option<&Path>, env_var: &str) -> Self {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(env_var).map(PathBuf::from));
        let bundled = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(BUNDLED_DIR).join(TOOL_NAME)));
        Self {
            explicit,
            path_var: std::env::var_os("PATH"),
            bundled,
            extract_dir: std::env::temp_dir().join(EXTRACT_DIR),
        }
    }

    pub fn resolve(&self) -> Result<PathBuf> {
        if let Some(candidate) = &self.explicit {
            if candidate.is_file() {
                tracing::debug!(target: "sketchbridge.local", "using explicit build tool {}", candidate.display());
                return Ok(candidate.clone());
            }
            tracing::warn!(
                target: "sketchbridge.local",
                "ignoring build tool override {}: not a file",
                candidate.display()
            );
        }

        if let Some(path_var) = &self.path_var {
            if let Some(found) = std::env::split_paths(path_var)
                .map(|dir| dir.join(TOOL_NAME))
                .find(|candidate| is_runnable(candidate))
            {
                tracing::debug!(target: "sketchbridge.local", "found build tool on PATH at {}", found.display());
                return Ok(found);
            }
        }

        if let Some(bundled) = self.bundled.as_ref().filter(|p| p.is_file()) {
            return extract_bundled(bundled, &self.extract_dir);
        }

        Err(BridgeError::ToolNotFound(format!(
            "{} was not found. Set {}, add it to PATH, or place it in a '{}' directory next to the executable.",
            TOOL_NAME, TOOL_ENV_VAR, BUNDLED_DIR
        )))
    }
}

/// Resolve the build tool from the process environment.
pub fn resolve_tool(explicit: Option<&Path>) -> Result<PathBuf> {
    ToolSearch::from_env(explicit, TOOL_ENV_VAR).resolve()
}

fn is_runnable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path)
            .map(|meta| meta.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        true
    }
}

fn extract_bundled(bundled: &Path, extract_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(extract_dir)?;
    let dest = extract_dir.join(TOOL_NAME);
    std::fs::copy(bundled, &dest).map_err(|e| {
        BridgeError::ToolNotFound(format!(
            "failed to extract bundled {} to {}: {}",
            TOOL_NAME,
            dest.display(),
            e
        ))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&dest)?.permissions();
        perms.set_mode(perms.mode() | 0o100);
        std::fs::set_permissions(&dest, perms)?;
    }

    tracing::info!(target: "sketchbridge.local", "using bundled build tool at {}", dest.display());
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_tool(dir: &Path, executable: bool) -> PathBuf {
        let path = dir.join(TOOL_NAME);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = if executable { 0o755 } else { 0o644 };
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).unwrap();
        }
        #[cfg(not(unix))]
        let _ = executable;
        path
    }

    #[test]
    fn test_explicit_path_wins() {
        let temp = TempDir::new().unwrap();
        let explicit = write_tool(temp.path(), true);
        let search = ToolSearch {
            explicit: Some(explicit.clone()),
            extract_dir: temp.path().join("extract"),
            ..Default::default()
        };
        assert_eq!(search.resolve().unwrap(), explicit);
    }

    #[test]
    fn test_missing_explicit_falls_back_to_path() {
        let temp = TempDir::new().unwrap();
        let bin = temp.path().join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        let on_path = write_tool(&bin, true);
        let search = ToolSearch {
            explicit: Some(temp.path().join("missing")),
            path_var: Some(std::env::join_paths([temp.path().join("empty"), bin]).unwrap()),
            bundled: None,
            extract_dir: temp.path().join("extract"),
        };
        assert_eq!(search.resolve().unwrap(), on_path);
    }

    #[cfg(unix)]
    #[test]
    fn test_path_skips_non_executable() {
        let temp = TempDir::new().unwrap();
        write_tool(temp.path(), false);
        let search = ToolSearch {
            path_var: Some(temp.path().as_os_str().to_os_string()),
            extract_dir: temp.path().join("extract"),
            ..Default::default()
        };
        assert!(matches!(search.resolve(), Err(BridgeError::ToolNotFound(_))));
    }

    #[test]
    fn test_bundled_is_extracted() {
        let temp = TempDir::new().unwrap();
        let bundle_dir = temp.path().join("tools");
        std::fs::create_dir_all(&bundle_dir).unwrap();
        let bundled = write_tool(&bundle_dir, false);
        let extract_dir = temp.path().join("extract");
        let search = ToolSearch {
            bundled: Some(bundled),
            extract_dir: extract_dir.clone(),
            ..Default::default()
        };
        let resolved = search.resolve().unwrap();
        assert_eq!(resolved, extract_dir.join(TOOL_NAME));
        assert!(is_runnable(&resolved));
    }

    #[test]
    fn test_nothing_found() {
        let temp = TempDir::new().unwrap();
        let search = ToolSearch {
            extract_dir: temp.path().join("extract"),
            ..Default::default()
        };
        let err = search.resolve().unwrap_err();
        assert!(matches!(err, BridgeError::ToolNotFound(_)));
        assert!(err.to_string().contains(TOOL_ENV_VAR));
    }
}
