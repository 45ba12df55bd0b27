//! # sdlog - Double-buffered append logger for block storage
//!
//! A byte-oriented logger for small devices that write their log to a file
//! on an SD card or similar block device.
//!
//! ## Design
//!
//! - Producer path: `put_byte` appends to a fixed ring buffer, O(1), no I/O
//! - Staging: `prepare_buffer` moves a bounded slice into a smaller ready buffer
//! - Flush: the ready buffer (or the primary one when nothing is staged) is
//!   written in FIFO order as at most two linear writes, synced, then reset
//! - A short write is an error and leaves the buffer untouched; later
//!   flushes are refused until the buffer is cleared or a new file is opened
//! - Without a device the logger keeps buffering, overwriting the oldest bytes
//!
//! Errors are returned, never acted upon. See [`fatal`] for the halt-on-error
//! policy.
//!
//! ## Example
//!
//! ```
//! use sdlog::{BufferedFileLogger, FileName, LogSink, MemDevice};
//!
//! let device = MemDevice::new(1 << 20);
//! let mut logger: BufferedFileLogger<MemDevice> = BufferedFileLogger::new();
//!
//! // Bytes logged before the card is attached are kept
//! logger.put_bytes(b"booting\n");
//! logger.begin(device.clone(), FileName::new("log000.txt")?)?;
//!
//! logger.put_bytes(b"sensor ok\n");
//! logger.prepare_buffer();
//! logger.flush()?;
//!
//! assert_eq!(device.contents("log000.txt").unwrap(), b"booting\nsensor ok\n");
//! # Ok::<(), sdlog::LogError>(())
//! ```

#![warn(missing_docs)]

mod drain;
pub mod error;
pub mod fatal;
mod fs;
mod logger;
mod mem;
mod ring_buffer;
mod sink;
mod storage;
mod stream;

pub use drain::{drain, Drained, ShortDrain};
pub use error::{LogError, Result};
pub use fs::{FsDevice, FsFile};
pub use logger::{
    BufferedFileLogger, LoggerConfig, StageTermination, BUFFER_SIZE, READY_BUFFER_SIZE,
};
pub use mem::{MemDevice, MemFile};
pub use ring_buffer::RingBuffer;
pub use sink::{BufferUsage, LogSink};
pub use storage::{
    BlockDevice, DeviceFault, FileName, StorageFile, FILE_NAME_MAX, SECTOR_SHIFT,
};
pub use stream::StreamLogger;
