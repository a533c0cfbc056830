//! Bounds-checked binary cursor
//!
//! Sequential little-endian reader over instruction payloads. An
//! out-of-range read sets a sticky error flag and yields a zero value
//! instead of panicking, so decoders can perform several positional reads
//! and check the flag once at the end.
//!
//! Cursors are checked out of a shared pool and returned on drop, which also
//! clears the held buffer so no state leaks into the next checkout. The
//! guard discipline makes release happen on every exit path, including early
//! decode failure.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

#[derive(Debug, Default)]
pub struct Cursor {
    buf: Vec<u8>,
    offset: usize,
    failed: bool,
}

impl Cursor {
    fn load(&mut self, data: &[u8]) {
        self.buf.clear();
        self.buf.extend_from_slice(data);
        self.offset = 0;
        self.failed = false;
    }

    /// Drops the held buffer. Called on guard drop; a released cursor holds
    /// no data from the previous decode.
    fn release(&mut self) {
        self.buf.clear();
        self.offset = 0;
        self.failed = false;
    }

    /// True once any read has run past the end of the buffer.
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.offset)
    }

    fn take(&mut self, len: usize) -> Option<&[u8]> {
        if self.failed {
            return None;
        }
        match self.buf.get(self.offset..self.offset + len) {
            Some(slice) => {
                self.offset += len;
                Some(slice)
            }
            None => {
                self.failed = true;
                None
            }
        }
    }

    pub fn skip(&mut self, len: usize) {
        self.take(len);
    }

    pub fn read_u8(&mut self) -> u8 {
        self.take(1).map_or(0, |s| s[0])
    }

    pub fn read_u16(&mut self) -> u16 {
        self.take(2)
            .map_or(0, |s| u16::from_le_bytes(s.try_into().unwrap()))
    }

    pub fn read_u32(&mut self) -> u32 {
        self.take(4)
            .map_or(0, |s| u32::from_le_bytes(s.try_into().unwrap()))
    }

    pub fn read_u64(&mut self) -> u64 {
        self.take(8)
            .map_or(0, |s| u64::from_le_bytes(s.try_into().unwrap()))
    }

    pub fn read_i64(&mut self) -> i64 {
        self.take(8)
            .map_or(0, |s| i64::from_le_bytes(s.try_into().unwrap()))
    }

    /// 128-bit little-endian value as a (hi, lo) pair of 64-bit halves.
    pub fn read_u128_parts(&mut self) -> (u64, u64) {
        let lo = self.read_u64();
        let hi = self.read_u64();
        (hi, lo)
    }

    /// u32-length-prefixed UTF-8 string. Invalid UTF-8 counts as a failed
    /// read.
    pub fn read_string(&mut self) -> String {
        let len = self.read_u32() as usize;
        match self.take(len).map(|s| std::str::from_utf8(s).map(str::to_owned)) {
            Some(Ok(s)) => s,
            Some(Err(_)) => {
                self.failed = true;
                String::new()
            }
            None => String::new(),
        }
    }

    /// 32 bytes rendered as a base58 public key.
    pub fn read_pubkey(&mut self) -> String {
        self.take(32)
            .map_or_else(String::new, |s| bs58::encode(s).into_string())
    }

    pub fn read_bytes(&mut self, len: usize) -> Vec<u8> {
        self.take(len).map_or_else(Vec::new, |s| s.to_vec())
    }
}

/// Shared cursor pool. Checkout and checkin are internally synchronized;
/// a checked-out cursor is owned by exactly one decode.
pub struct CursorPool {
    free: Mutex<Vec<Cursor>>,
}

impl CursorPool {
    pub fn new() -> Self {
        Self { free: Mutex::new(Vec::new()) }
    }

    pub fn acquire(&self, data: &[u8]) -> CursorGuard<'_> {
        let mut cursor = self.free.lock().pop().unwrap_or_default();
        cursor.load(data);
        CursorGuard { pool: self, cursor: Some(cursor) }
    }
}

impl Default for CursorPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped checkout of a pooled cursor.
pub struct CursorGuard<'p> {
    pool: &'p CursorPool,
    cursor: Option<Cursor>,
}

impl Deref for CursorGuard<'_> {
    type Target = Cursor;

    fn deref(&self) -> &Cursor {
        self.cursor.as_ref().unwrap()
    }
}

impl DerefMut for CursorGuard<'_> {
    fn deref_mut(&mut self) -> &mut Cursor {
        self.cursor.as_mut().unwrap()
    }
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut cursor) = self.cursor.take() {
            cursor.release();
            self.pool.free.lock().push(cursor);
        }
    }
}

static POOL: Lazy<CursorPool> = Lazy::new(CursorPool::new);

/// The process-wide cursor pool used by all protocol decoders.
pub fn cursor_pool() -> &'static CursorPool {
    &POOL
}
