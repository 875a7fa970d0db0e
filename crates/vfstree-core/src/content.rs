// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Content storage strategies for file data
//!
//! A file or block device owns exactly one content object. The engine talks
//! to it through the `Content` trait so the byte-storage strategy stays
//! pluggable: `BufferContent` materializes everything in memory,
//! `SparseContent` only declares a size and never allocates.

/// Byte-storage strategy backing a file or block device.
///
/// `read` never fails: reading past the declared size yields zero bytes.
/// `write` and `truncate` are infallible at this layer; quota authorization
/// happens in the engine before they are invoked.
#[cfg_attr(test, mockall::automock)]
pub trait Content: Send {
    /// Declared length in bytes
    fn size(&self) -> u64;

    /// Copy up to `buf.len()` bytes starting at `offset` into `buf`,
    /// returning the number of bytes copied
    fn read(&self, offset: u64, buf: &mut [u8]) -> usize;

    /// Overwrite or extend starting at `offset`, zero-filling any gap past
    /// the current end. Returns the number of bytes written.
    fn write(&mut self, offset: u64, data: &[u8]) -> usize;

    /// Shrink or grow to exactly `new_len`, zero-filling on growth
    fn truncate(&mut self, new_len: u64);
}

/// Fully materialized in-memory content. Size always equals the backing
/// buffer's length.
#[derive(Clone, Debug, Default)]
pub struct BufferContent {
    data: Vec<u8>,
}

impl BufferContent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

impl Content for BufferContent {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> usize {
        let start = offset as usize;
        if start >= self.data.len() {
            return 0;
        }
        let end = std::cmp::min(start + buf.len(), self.data.len());
        let count = end - start;
        buf[..count].copy_from_slice(&self.data[start..end]);
        count
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> usize {
        let start = offset as usize;
        let end = start + data.len();
        if end > self.data.len() {
            self.data.resize(end, 0);
        }
        self.data[start..end].copy_from_slice(data);
        data.len()
    }

    fn truncate(&mut self, new_len: u64) {
        self.data.resize(new_len as usize, 0);
    }
}

/// Content that declares an arbitrary size without allocating storage.
///
/// Reads always synthesize zeroes, even over ranges previously written;
/// callers simulating huge files must treat that as expected behavior.
/// The declared size is a stored field, so stat reflects it faithfully.
#[derive(Clone, Copy, Debug, Default)]
pub struct SparseContent {
    size: u64,
}

impl SparseContent {
    pub fn new(size: u64) -> Self {
        Self { size }
    }

    /// Redeclare the size without touching any storage
    pub fn set_size(&mut self, size: u64) {
        self.size = size;
    }
}

impl Content for SparseContent {
    fn size(&self) -> u64 {
        self.size
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> usize {
        if offset >= self.size {
            return 0;
        }
        let count = std::cmp::min(buf.len() as u64, self.size - offset) as usize;
        buf[..count].fill(0);
        count
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> usize {
        let end = offset + data.len() as u64;
        self.size = std::cmp::max(self.size, end);
        data.len()
    }

    fn truncate(&mut self, new_len: u64) {
        self.size = new_len;
    }
}
