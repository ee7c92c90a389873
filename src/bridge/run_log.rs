// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Append-only compile/upload run records

use std::io::Write;
use std::path::Path;

use chrono::{SecondsFormat, Utc};

use crate::backend::BackendResult;

const SEPARATOR_WIDTH: usize = 80;

/// Render one run record. `fallback` names the command when the backend
/// did not report one.
pub fn format_record(result: &BackendResult, fallback: &str) -> String {
    let command = if result.command.is_empty() {
        fallback.to_string()
    } else {
        result.command.join(" ")
    };
    let mut record = format!(
        "\n{}\n{} | {} | {}\n",
        "=".repeat(SEPARATOR_WIDTH),
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        if result.success { "OK" } else { "FAIL" },
        command
    );
    let stdout = result.stdout.trim();
    if !stdout.is_empty() {
        record.push_str(&format!("\n[STDOUT]\n{}\n", stdout));
    }
    let stderr = result.stderr.trim();
    if !stderr.is_empty() {
        record.push_str(&format!("\n[STDERR]\n{}\n", stderr));
    }
    record
}

/// Append a record to `path`, creating parent directories.
pub fn append(path: &Path, result: &BackendResult, fallback: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(format_record(result, fallback).as_bytes())
}

/// Like [`append`], but a failure is only logged.
pub fn record(path: &Path, result: &BackendResult, fallback: &str) {
    if let Err(e) = append(path, result, fallback) {
        tracing::warn!(
            target: "sketchbridge.bridge",
            "failed to write run log {}: {}",
            path.display(),
            e
        );
    }
}
