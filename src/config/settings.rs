// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for sketchbridge
//!
//! Handles loading and saving settings from ~/.sketchbridge/settings.json

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::backend::toolchain::TOOL_ENV_VAR;
use crate::board::DEFAULT_BOARD;
use crate::bridge::{Mode, ModeOptions};
use crate::project::{DEFAULT_PROJECTS_DIR, DEFAULT_PROJECT_NAME};

mod io;

/// Main settings structure, stored in ~/.sketchbridge/settings.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Backend used when none is given on the command line
    #[serde(default)]
    pub mode: Mode,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub toolchain: ToolchainConfig,

    #[serde(default)]
    pub projects: ProjectsConfig,

    /// Board selected for new projects
    #[serde(default = "default_board")]
    pub default_board: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            remote: RemoteConfig::default(),
            toolchain: ToolchainConfig::default(),
            projects: ProjectsConfig::default(),
            default_board: default_board(),
        }
    }
}

/// Remote agent connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    #[serde(default = "default_remote_url")]
    pub url: String,

    /// Stored token; the environment variable wins when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default = "default_token_env")]
    pub token_env: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: default_remote_url(),
            token: None,
            token_env: default_token_env(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Build tool lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Explicit path to the build tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cli_path: Option<PathBuf>,

    #[serde(default = "default_tool_env_var")]
    pub env_var: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            cli_path: None,
            env_var: default_tool_env_var(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectsConfig {
    #[serde(default = "default_projects_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_project_name")]
    pub default_name: String,
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            dir: default_projects_dir(),
            default_name: default_project_name(),
        }
    }
}

impl Settings {
    /// Remote token, checking the environment variable first.
    pub fn remote_token(&self) -> Option<String> {
        std::env::var(&self.remote.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| self.remote.token.clone())
    }

    /// Build tool override: configured path, else the configured env var.
    pub fn tool_path(&self) -> Option<PathBuf> {
        self.toolchain
            .cli_path
            .clone()
            .or_else(|| std::env::var_os(&self.toolchain.env_var).map(PathBuf::from))
    }

    /// Backend parameters derived from these settings
    pub fn mode_options(&self) -> ModeOptions {
        ModeOptions {
            remote_url: Some(self.remote.url.clone()),
            token: self.remote_token(),
            tool_path: self.tool_path(),
            request_timeout: Duration::from_secs(self.remote.request_timeout_secs),
        }
    }
}

fn default_board() -> String {
    DEFAULT_BOARD.to_string()
}

fn default_remote_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_token_env() -> String {
    "SKETCHBRIDGE_TOKEN".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_tool_env_var() -> String {
    TOOL_ENV_VAR.to_string()
}

fn default_projects_dir() -> PathBuf {
    PathBuf::from(DEFAULT_PROJECTS_DIR)
}

fn default_project_name() -> String {
    DEFAULT_PROJECT_NAME.to_string()
}
