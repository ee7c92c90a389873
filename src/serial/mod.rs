// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Serial channel for one board
//!
//! A `SerialChannel` holds the port configuration and at most one live OS
//! handle. Handles are acquired with `open()` and released with `close()`;
//! reads and writes in between are line oriented and bounded by the configured
//! device timeout.
//!
//! Clones of a channel share the same handle. This is what lets one thread
//! block in [`SerialChannel::read_lines`] while another calls
//! [`SerialChannel::close`] to cancel it: the reader sees `NotOpen` on its next
//! iteration.
//!
//! The channel is not reentrant. Two concurrent readers on the same handle
//! will split lines between them.

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

mod encoding;
pub mod mock;
mod ports;

pub use encoding::TextEncoding;
pub use ports::{list_ports, pick_port, suggest_port};

pub const DEFAULT_BAUDRATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT_SECS: f64 = 0.1;
pub const DEFAULT_ENCODING: &str = "utf-8";

/// Pause between empty reads in `read_lines`/`listen`
const IDLE_BACKOFF: Duration = Duration::from_millis(10);
const READ_CHUNK: usize = 256;

/// Serial line settings, as carried in the board JSON (`serial` object)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerialConfig {
    #[serde(default = "default_baudrate")]
    pub baudrate: u32,

    /// Read/write timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: f64,

    #[serde(default = "default_encoding")]
    pub encoding: String,

    /// Strip trailing CR/LF from received lines
    #[serde(default = "default_autostrip")]
    pub autostrip: bool,
}

fn default_baudrate() -> u32 {
    DEFAULT_BAUDRATE
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_encoding() -> String {
    DEFAULT_ENCODING.to_string()
}

fn default_autostrip() -> bool {
    true
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baudrate: default_baudrate(),
            timeout: default_timeout(),
            encoding: default_encoding(),
            autostrip: default_autostrip(),
        }
    }
}

impl SerialConfig {
    /// Timeout as a `Duration`; negative or non-finite values fall back to the default.
    pub fn timeout_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS))
    }

    /// Encoding used to decode received bytes. Unknown labels decode as latin-1.
    pub fn decoder(&self) -> TextEncoding {
        TextEncoding::from_label(&self.encoding).unwrap_or(TextEncoding::Latin1)
    }

    /// Encoding used for outgoing text. Unknown labels encode as UTF-8.
    pub fn encoder(&self) -> TextEncoding {
        TextEncoding::from_label(&self.encoding).unwrap_or(TextEncoding::Utf8)
    }
}

/// Partial serial reconfiguration; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SerialOptions {
    pub port: Option<String>,
    pub baudrate: Option<u32>,
    pub timeout: Option<f64>,
    pub encoding: Option<String>,
    pub autostrip: Option<bool>,
}

impl SerialOptions {
    /// Options that reset every line setting to `config` (port untouched).
    pub fn from_config(config: &SerialConfig) -> Self {
        Self {
            port: None,
            baudrate: Some(config.baudrate),
            timeout: Some(config.timeout),
            encoding: Some(config.encoding.clone()),
            autostrip: Some(config.autostrip),
        }
    }
}

/// Byte stream of an open serial device.
///
/// Reads must return `TimedOut` (or `WouldBlock`) once the device timeout
/// expires with no data.
pub trait SerialLink: Read + Write + Send {}

impl<T: Read + Write + Send + ?Sized> SerialLink for T {}

/// Acquires OS serial handles. Swapped out in tests.
pub trait PortOpener: Send + Sync {
    fn open(&self, port: &str, baudrate: u32, timeout: Duration) -> Result<Box<dyn SerialLink>>;
}

/// Opens real devices through the `serialport` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPortOpener;

impl PortOpener for SystemPortOpener {
    fn open(&self, port: &str, baudrate: u32, timeout: Duration) -> Result<Box<dyn SerialLink>> {
        let handle = serialport::new(port, baudrate)
            .timeout(timeout)
            .open()
            .map_err(|source| BridgeError::SerialOpen {
                port: port.to_string(),
                source,
            })?;
        Ok(Box::new(handle))
    }
}

struct OpenLink {
    io: Box<dyn SerialLink>,
    /// Bytes received past the last returned frame
    pending: Vec<u8>,
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

impl OpenLink {
    /// Next newline-terminated frame, or the partial frame received before
    /// `timeout` expired. `None` when nothing arrived at all.
    fn next_frame(&mut self, timeout: Duration) -> io::Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
                return Ok(Some(self.pending.drain(..=pos).collect()));
            }
            if !self.fill()? || Instant::now() >= deadline {
                break;
            }
        }
        if self.pending.is_empty() {
            Ok(None)
        } else {
            Ok(Some(std::mem::take(&mut self.pending)))
        }
    }

    /// Read one chunk into `pending`. Returns false on timeout.
    fn fill(&mut self) -> io::Result<bool> {
        let mut buf = [0u8; READ_CHUNK];
        match self.io.read(&mut buf) {
            Ok(0) => Ok(false),
            Ok(n) => {
                self.pending.extend_from_slice(&buf[..n]);
                Ok(true)
            }
            Err(e) if is_timeout(&e) => Ok(false),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(true),
            Err(e) => Err(e),
        }
    }

    /// Raw bytes: up to `limit`, or everything available before a timeout.
    fn take_bytes(&mut self, limit: Option<usize>) -> io::Result<Vec<u8>> {
        loop {
            if limit.is_some_and(|n| self.pending.len() >= n) {
                break;
            }
            if !self.fill()? {
                break;
            }
        }
        let n = limit.map_or(self.pending.len(), |n| n.min(self.pending.len()));
        Ok(self.pending.drain(..n).collect())
    }
}

/// One board's serial line: configuration plus an optional live handle
#[derive(Clone)]
pub struct SerialChannel {
    port: Option<String>,
    config: SerialConfig,
    link: Arc<Mutex<Option<OpenLink>>>,
    opener: Arc<dyn PortOpener>,
}

impl fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialChannel")
            .field("port", &self.port)
            .field("config", &self.config)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Default for SerialChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialChannel {
    /// Closed channel with default settings, backed by real devices
    pub fn new() -> Self {
        Self::with_opener(Arc::new(SystemPortOpener))
    }

    /// Closed channel with default settings and a custom handle source
    pub fn with_opener(opener: Arc<dyn PortOpener>) -> Self {
        Self {
            port: None,
            config: SerialConfig::default(),
            link: Arc::new(Mutex::new(None)),
            opener,
        }
    }

    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Merge the given fields into the current settings.
    ///
    /// Works whether or not the channel is open; an open handle keeps its
    /// original baud rate and timeout until it is reopened. An empty port
    /// string unsets the port.
    pub fn configure(&mut self, options: &SerialOptions) {
        if let Some(port) = &options.port {
            let port = port.trim();
            self.port = (!port.is_empty()).then(|| port.to_string());
        }
        if let Some(baudrate) = options.baudrate {
            self.config.baudrate = baudrate;
        }
        if let Some(timeout) = options.timeout {
            self.config.timeout = timeout;
        }
        if let Some(encoding) = &options.encoding {
            self.config.encoding = encoding.clone();
        }
        if let Some(autostrip) = options.autostrip {
            self.config.autostrip = autostrip;
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<OpenLink>> {
        self.link.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Acquire the OS handle. No-op when already open.
    pub fn open(&self) -> Result<()> {
        let port = self.port.as_deref().ok_or_else(|| {
            BridgeError::Config("Port is not set. Configure a serial port first.".to_string())
        })?;
        let mut guard = self.lock();
        if guard.is_some() {
            return Ok(());
        }
        let io = self
            .opener
            .open(port, self.config.baudrate, self.config.timeout_duration())?;
        *guard = Some(OpenLink {
            io,
            pending: Vec::new(),
        });
        tracing::debug!(
            target: "sketchbridge.serial",
            "opened {} at {} baud",
            port,
            self.config.baudrate
        );
        Ok(())
    }

    /// Release the handle if held. Safe to call repeatedly.
    pub fn close(&self) {
        if self.lock().take().is_some() {
            tracing::debug!(
                target: "sketchbridge.serial",
                "closed {}",
                self.port.as_deref().unwrap_or("<unset>")
            );
        }
    }

    fn io_error(&self, action: &str, err: io::Error) -> BridgeError {
        BridgeError::Serial(format!(
            "{} failed on {}: {}",
            action,
            self.port.as_deref().unwrap_or("<unset>"),
            err
        ))
    }

    fn decode(&self, raw: &[u8]) -> String {
        let text = self.config.decoder().decode(raw);
        if self.config.autostrip {
            text.trim_end_matches(|c| c == '\r' || c == '\n').to_string()
        } else {
            text
        }
    }

    /// Next line from the device, or `None` if the timeout expired with no data.
    pub fn read_line(&self) -> Result<Option<String>> {
        let timeout = self.config.timeout_duration();
        let mut guard = self.lock();
        let link = guard.as_mut().ok_or(BridgeError::NotOpen)?;
        let frame = link
            .next_frame(timeout)
            .map_err(|e| self.io_error("read", e))?;
        Ok(frame.map(|raw| self.decode(&raw)))
    }

    /// Block until `count` lines arrived (at least one).
    ///
    /// There is no overall time limit; closing the channel from another
    /// clone ends the wait with `NotOpen`.
    pub fn read_lines(&self, count: usize) -> Result<Vec<String>> {
        let count = count.max(1);
        let mut lines = Vec::with_capacity(count);
        while lines.len() < count {
            match self.read_line()? {
                Some(line) => lines.push(line),
                None => std::thread::sleep(IDLE_BACKOFF),
            }
        }
        Ok(lines)
    }

    /// Raw bytes: at most `size`, or everything currently available when `None`.
    pub fn read_bytes(&self, size: Option<usize>) -> Result<Vec<u8>> {
        let mut guard = self.lock();
        let link = guard.as_mut().ok_or(BridgeError::NotOpen)?;
        link.take_bytes(size).map_err(|e| self.io_error("read", e))
    }

    /// Send `text` in the configured encoding, followed by `\n` unless suppressed.
    /// Returns the number of bytes written.
    pub fn write(&self, text: &str, append_newline: bool) -> Result<usize> {
        let mut payload = self.config.encoder().encode(text);
        if append_newline {
            payload.push(b'\n');
        }
        self.write_bytes(&payload)
    }

    fn write_bytes(&self, payload: &[u8]) -> Result<usize> {
        let mut guard = self.lock();
        let link = guard.as_mut().ok_or(BridgeError::NotOpen)?;
        link.io
            .write_all(payload)
            .and_then(|_| link.io.flush())
            .map_err(|e| self.io_error("write", e))?;
        Ok(payload.len())
    }

    /// Forward received lines to `sink` until `duration` elapses.
    ///
    /// Lines not starting with `prefix` (when given) are dropped. Without a
    /// duration the loop runs until the channel is closed, which counts as
    /// a normal stop.
    pub fn listen(
        &self,
        duration: Option<Duration>,
        prefix: Option<&str>,
        sink: &mut dyn FnMut(&str),
    ) -> Result<()> {
        let started = Instant::now();
        loop {
            if duration.is_some_and(|limit| started.elapsed() >= limit) {
                break;
            }
            let line = match self.read_line() {
                Ok(Some(line)) => line,
                Ok(None) => {
                    std::thread::sleep(IDLE_BACKOFF);
                    continue;
                }
                Err(BridgeError::NotOpen) => {
                    tracing::debug!(target: "sketchbridge.serial", "listen stopped: channel closed");
                    break;
                }
                Err(e) => return Err(e),
            };
            if prefix.map_or(true, |p| line.starts_with(p)) {
                sink(&line);
            }
        }
        Ok(())
    }
}
