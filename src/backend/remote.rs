// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Remote backend
//!
//! Stateless JSON-over-HTTP client for an agent that owns the board. Every
//! request carries the full board description and the `X-Auth-Token`
//! header; the agent opens and closes the port around each serial call.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::payload::{self, SketchPayload};
use super::{BackendResult, BuildBackend};
use crate::board::{Board, BoardRecord};
use crate::error::{BridgeError, RemoteError, Result};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const AUTH_HEADER: &str = "X-Auth-Token";

#[derive(Serialize)]
struct BuildRequest<'a> {
    board: BoardRecord,
    extra_args: &'a [String],
    #[serde(flatten)]
    sketch: SketchPayload,
}

#[derive(Serialize)]
struct BoardRequest {
    board: BoardRecord,
}

#[derive(Serialize)]
struct SizedRequest {
    board: BoardRecord,
    /// Byte count, line count, or -1 for "everything available"
    size: i64,
}

#[derive(Serialize)]
struct WriteRequest {
    board: BoardRecord,
    data_b64: String,
    append_newline: bool,
}

#[derive(Deserialize)]
struct ReadResponse {
    #[serde(default)]
    data_b64: Option<String>,
}

#[derive(Deserialize)]
struct LinesResponse {
    #[serde(default)]
    lines: Vec<String>,
}

#[derive(Deserialize)]
struct WriteResponse {
    #[serde(default)]
    written: usize,
}

/// Agent error bodies look like `{"error": "..."}` or plain text
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// Backend that forwards every operation to a remote agent
pub struct RemoteBackend {
    client: Client,
    base_url: String,
    token: String,
}

impl RemoteBackend {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &impl Serialize) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(target: "sketchbridge.remote", "POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(AUTH_HEADER, &self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::from_reqwest(path, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemoteError::from_reqwest(path, e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|b| b.error)
                .unwrap_or_else(|_| text.trim().to_string());
            tracing::warn!(target: "sketchbridge.remote", "{} returned {}", path, status);
            return Err(RemoteError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message,
            }
            .into());
        }

        serde_json::from_str(&text).map_err(|source| {
            RemoteError::InvalidResponse {
                path: path.to_string(),
                source,
            }
            .into()
        })
    }

    async fn build(
        &self,
        path: &str,
        board: &Board,
        sketch: &Path,
        extra_args: &[String],
    ) -> Result<BackendResult> {
        let request = BuildRequest {
            board: board.to_record(),
            extra_args,
            sketch: payload::package(sketch)?,
        };
        self.post(path, &request).await
    }
}

#[async_trait]
impl BuildBackend for RemoteBackend {
    fn name(&self) -> &str {
        "remote"
    }

    async fn compile(
        &self,
        board: &Board,
        sketch: &Path,
        extra_args: &[String],
    ) -> Result<BackendResult> {
        self.build("/compile", board, sketch, extra_args).await
    }

    async fn upload(
        &self,
        board: &Board,
        sketch: &Path,
        extra_args: &[String],
    ) -> Result<BackendResult> {
        self.build("/upload", board, sketch, extra_args).await
    }

    async fn open_serial(&self, board: &Board) -> Result<()> {
        let _: serde_json::Value = self
            .post("/serial/open", &BoardRequest { board: board.to_record() })
            .await?;
        Ok(())
    }

    async fn close_serial(&self, board: &Board) -> Result<()> {
        let _: serde_json::Value = self
            .post("/serial/close", &BoardRequest { board: board.to_record() })
            .await?;
        Ok(())
    }

    async fn read_serial(&self, board: &Board, size: Option<usize>) -> Result<Vec<u8>> {
        const PATH: &str = "/serial/read";
        let request = SizedRequest {
            board: board.to_record(),
            size: size.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX)),
        };
        let response: ReadResponse = self.post(PATH, &request).await?;
        match response.data_b64.as_deref() {
            None | Some("") => Ok(Vec::new()),
            Some(data) => payload::decode(data).map_err(|e| {
                RemoteError::InvalidPayload {
                    path: PATH.to_string(),
                    message: e.to_string(),
                }
                .into()
            }),
        }
    }

    async fn read_lines_serial(&self, board: &Board, count: usize) -> Result<Vec<String>> {
        let request = SizedRequest {
            board: board.to_record(),
            size: i64::try_from(count.max(1)).unwrap_or(i64::MAX),
        };
        let response: LinesResponse = self.post("/serial/readlines", &request).await?;
        Ok(response.lines)
    }

    async fn write_serial(
        &self,
        board: &Board,
        data: &str,
        append_newline: bool,
    ) -> Result<usize> {
        let bytes = board.serial().config().encoder().encode(data);
        let request = WriteRequest {
            board: board.to_record(),
            data_b64: payload::encode(&bytes),
            append_newline,
        };
        let response: WriteResponse = self.post("/serial/write", &request).await?;
        Ok(response.written)
    }
}
