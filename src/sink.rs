use crate::error::Result;

/// Fill level of an internal buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferUsage {
    /// Bytes currently buffered
    pub size: usize,
    /// Maximum bytes the buffer holds
    pub capacity: usize,
}

/// Byte sink behind a formatting log front end
///
/// The front end renders each log call to bytes and feeds them through
/// `put_byte`. `put_byte` must stay O(1) and free of I/O; everything slow
/// happens in `flush`.
pub trait LogSink {
    /// Bytes persisted by the backend so far
    fn size(&self) -> u64;

    /// Total bytes the backend can hold
    fn capacity(&self) -> u64;

    /// Buffer one byte. Never blocks and never fails.
    fn put_byte(&mut self, byte: u8);

    /// Move buffered bytes to the backend
    fn flush(&mut self) -> Result<()>;

    /// Drop everything still buffered
    fn clear(&mut self);

    /// Bytes waiting in the primary buffer
    fn internal_size(&self) -> usize;

    /// Maximum bytes the primary buffer holds
    fn internal_capacity(&self) -> usize;

    /// Secondary (staging) buffer, for backends that have one
    fn staging(&self) -> Option<BufferUsage> {
        None
    }

    /// Buffer every byte of `bytes` in order
    fn put_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.put_byte(b);
        }
    }
}
