// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! In-memory serial device for testing
//!
//! `MockLink` behaves like a device whose read timeout always expires
//! immediately: reads return queued bytes or `TimedOut`. Writes are captured.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{BridgeError, Result};
use crate::serial::{PortOpener, SerialLink};

/// A fake serial device shared between the test and the channel under test
#[derive(Clone, Default)]
pub struct MockLink {
    incoming: Arc<Mutex<VecDeque<u8>>>,
    outgoing: Arc<Mutex<Vec<u8>>>,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes as if the board had sent them
    pub fn push_incoming(&self, bytes: &[u8]) {
        let mut queue = self.incoming.lock().unwrap_or_else(|e| e.into_inner());
        queue.extend(bytes.iter().copied());
    }

    /// Everything written to the device so far
    pub fn written(&self) -> Vec<u8> {
        self.outgoing
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Bytes queued but not yet read
    pub fn pending(&self) -> usize {
        self.incoming.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Read for MockLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut queue = self.incoming.lock().unwrap_or_else(|e| e.into_inner());
        if queue.is_empty() {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        }
        let n = buf.len().min(queue.len());
        for (slot, byte) in buf.iter_mut().zip(queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MockLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = self.outgoing.lock().unwrap_or_else(|e| e.into_inner());
        out.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Opener that hands out clones of one `MockLink`
#[derive(Clone, Default)]
pub struct MockPortOpener {
    link: MockLink,
    opened: Arc<AtomicUsize>,
    refuse: bool,
}

impl MockPortOpener {
    pub fn new(link: MockLink) -> Self {
        Self {
            link,
            opened: Arc::new(AtomicUsize::new(0)),
            refuse: false,
        }
    }

    /// An opener that fails every open as if the device were missing
    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    /// How many times a handle was acquired
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl PortOpener for MockPortOpener {
    fn open(&self, port: &str, _baudrate: u32, _timeout: Duration) -> Result<Box<dyn SerialLink>> {
        if self.refuse {
            return Err(BridgeError::SerialOpen {
                port: port.to_string(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "no such device"),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(self.link.clone()))
    }
}
