// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Sketch packaging for the remote agent
//!
//! A sketch directory travels as a base64 zip (`sketch_zip_b64`); a single
//! file travels as base64 bytes (`sketch_b64`). Both carry a `sketch_name`
//! that the agent uses as its workspace folder.

use std::io::{Cursor, Write};
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Serialize;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::{BridgeError, Result};

/// Folder name the agent uses for single-file sketches. The build tool
/// requires the main file to match its folder, and the agent always writes
/// single files as `sketch.ino`.
pub const SINGLE_FILE_SKETCH_NAME: &str = "sketch";

/// Sketch fields of a compile/upload request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SketchPayload {
    Archive {
        sketch_zip_b64: String,
        sketch_name: String,
    },
    File {
        sketch_b64: String,
        sketch_name: String,
    },
}

impl SketchPayload {
    pub fn sketch_name(&self) -> &str {
        match self {
            SketchPayload::Archive { sketch_name, .. } | SketchPayload::File { sketch_name, .. } => {
                sketch_name
            }
        }
    }
}

/// Package a sketch directory or single file.
pub fn package(sketch: &Path) -> Result<SketchPayload> {
    if sketch.is_dir() {
        let name = sketch
            .canonicalize()?
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| SINGLE_FILE_SKETCH_NAME.to_string());
        let archive = zip_directory(sketch)?;
        tracing::debug!(
            target: "sketchbridge.remote",
            "packaged {} ({} bytes zipped)",
            sketch.display(),
            archive.len()
        );
        Ok(SketchPayload::Archive {
            sketch_zip_b64: encode(&archive),
            sketch_name: name,
        })
    } else if sketch.is_file() {
        let bytes = std::fs::read(sketch)?;
        Ok(SketchPayload::File {
            sketch_b64: encode(&bytes),
            sketch_name: SINGLE_FILE_SKETCH_NAME.to_string(),
        })
    } else {
        Err(BridgeError::InvalidArgument(format!(
            "Sketch path does not exist: {}",
            sketch.display()
        )))
    }
}

/// Zip every regular file under `dir`, with paths relative to `dir`.
pub fn zip_directory(dir: &Path) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| BridgeError::Archive(e.to_string()))?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        zip.start_file(name, options)?;
        zip.write_all(&std::fs::read(entry.path())?)?;
    }

    Ok(zip.finish()?.into_inner())
}

pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode(text: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(text)
}
