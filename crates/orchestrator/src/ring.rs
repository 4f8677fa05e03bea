// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

/// Fixed-capacity growable byte sink used to cap captured command output
/// (stdout/stderr each capped at 256 KiB with a
/// truncation flag). Unlike a circular buffer this keeps the *earliest*
/// bytes and simply stops accepting more once full, since a truncated
/// Observation must report a prefix of the real output, not an arbitrary
/// window of it.
#[derive(Debug, Default)]
pub struct CappedBuffer {
    buf: Vec<u8>,
    capacity: usize,
    truncated: bool,
}

impl CappedBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity.min(64 * 1024)), capacity, truncated: false }
    }

    /// Append data, silently dropping anything past `capacity` and raising
    /// the truncation flag the first time that happens.
    pub fn write(&mut self, data: &[u8]) {
        if self.buf.len() >= self.capacity {
            if !data.is_empty() {
                self.truncated = true;
            }
            return;
        }

        let remaining = self.capacity - self.buf.len();
        if data.len() > remaining {
            self.buf.extend_from_slice(&data[..remaining]);
            self.truncated = true;
        } else {
            self.buf.extend_from_slice(data);
        }
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Lossily decode the captured bytes as UTF-8 for display/storage.
    pub fn into_string(self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

#[cfg(test)]
#[path = "ring_tests.rs"]
mod tests;
