// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::Result;

use super::Settings;

impl Settings {
    /// Get the default settings file path.
    pub fn default_path() -> PathBuf {
        Self::home().join("settings.json")
    }

    /// Load settings from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load settings from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save settings to a specific path, keeping keys this version does not know.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut value = serde_json::to_value(self)?;
        if let Ok(content) = std::fs::read_to_string(path) {
            // Unparseable files are overwritten
            if let Ok(existing) = serde_json::from_str::<Value>(&content) {
                value = overlay(existing, value);
            }
        }

        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
        Ok(())
    }

    /// Get the sketchbridge home directory (~/.sketchbridge or $SKETCHBRIDGE_HOME).
    pub fn home() -> PathBuf {
        if let Ok(home) = std::env::var("SKETCHBRIDGE_HOME") {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".sketchbridge")
    }
}

/// Recursively write `top` over `base`; objects merge, everything else replaces.
fn overlay(base: Value, top: Value) -> Value {
    match (base, top) {
        (Value::Object(mut merged), Value::Object(top)) => {
            for (key, value) in top {
                let next = match merged.remove(&key) {
                    Some(old) => overlay(old, value),
                    None => value,
                };
                merged.insert(key, next);
            }
            Value::Object(merged)
        }
        (_, top) => top,
    }
}
