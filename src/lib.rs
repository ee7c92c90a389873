// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! sketchbridge - Arduino build, upload and serial tooling for notebooks and terminals.
//!
//! This crate exposes the shared runtime used by the `sketchbridge` CLI
//! (`src/main.rs`) and by anything embedding it as a library.
//!
//! Architecture highlights:
//! - `code`: section/cell store and the sketch generator and parser
//! - `backend`: the `BuildBackend` trait with local (arduino-cli) and remote (HTTP agent) implementations
//! - `bridge`: mode selection plus compile/upload orchestration and run logs
//! - `serial`, `board`: the device side of a session
//! - `project`, `session`, `config`: persistence and the explicit working context

pub mod backend;
pub mod board;
pub mod bridge;
pub mod cli;
pub mod code;
pub mod config;
pub mod error;
pub mod project;
pub mod serial;
pub mod session;

pub use error::{BridgeError, Result};
