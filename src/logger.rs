use crate::drain::{drain, ShortDrain};
use crate::error::{LogError, Result};
use crate::ring_buffer::RingBuffer;
use crate::sink::{BufferUsage, LogSink};
use crate::storage::{BlockDevice, DeviceFault, FileName, StorageFile};
use std::fmt;
use tracing::{debug, info, trace, warn};

/// Primary buffer capacity in bytes
pub const BUFFER_SIZE: usize = 1024;

/// Ready (staging) buffer capacity in bytes
pub const READY_BUFFER_SIZE: usize = 512;

/// How `prepare_buffer` decides the primary buffer is exhausted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageTermination {
    /// A zero byte ends the pass and is discarded.
    ///
    /// Streams that may contain literal zero bytes lose them here, and the
    /// bytes after them wait for the next pass.
    #[default]
    ZeroByte,
    /// Stage until the buffer is empty; zero bytes are ordinary data
    Length,
}

/// Configuration for BufferedFileLogger
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// File opened by `begin_default`
    pub file_name: FileName,
    /// Discard existing file contents when a file is opened
    pub truncate_on_open: bool,
    /// End-of-pass rule for `prepare_buffer`
    pub staging: StageTermination,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            file_name: FileName::default(),
            truncate_on_open: true,
            staging: StageTermination::ZeroByte,
        }
    }
}

struct OpenFile<F> {
    handle: F,
    name: FileName,
}

/// Double-buffered logger persisting to a single file on a block device
///
/// - `put_byte` appends to a `C1`-byte ring buffer and never touches storage
/// - `prepare_buffer` stages up to `C2` bytes into the ready buffer
/// - `flush` drains the ready buffer if it holds anything, the primary
///   buffer otherwise
///
/// Without an attached device (`begin_buffered`) the logger only buffers:
/// once the primary buffer is full the oldest bytes are overwritten and
/// `flush` leaves everything in place.
///
/// A failed write or sync latches the logger: every later `flush`,
/// `flush_all` and `close_file` is refused with `LogError::Latched` and the
/// buffers keep their contents, so nothing is written to the file twice.
/// `clear`, `open_file` and `begin` release the latch.
///
/// Not synchronized. `put_byte` and `flush` must not run concurrently.
pub struct BufferedFileLogger<
    D: BlockDevice,
    const C1: usize = BUFFER_SIZE,
    const C2: usize = READY_BUFFER_SIZE,
> {
    config: LoggerConfig,
    device: Option<D>,
    file: Option<OpenFile<D::File>>,
    /// Step that failed last, until released
    failed: Option<&'static str>,
    log_buffer: RingBuffer<C1>,
    ready_buffer: RingBuffer<C2>,
}

impl<D: BlockDevice, const C1: usize, const C2: usize> BufferedFileLogger<D, C1, C2> {
    const READY_FITS: () = assert!(C2 <= C1, "ready buffer must not exceed the primary buffer");

    /// Create a logger in buffer-only mode with the default config
    pub fn new() -> Self {
        Self::with_config(LoggerConfig::default())
    }

    /// Create a logger in buffer-only mode
    pub fn with_config(config: LoggerConfig) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::READY_FITS;
        Self {
            config,
            device: None,
            file: None,
            failed: None,
            log_buffer: RingBuffer::new(),
            ready_buffer: RingBuffer::new(),
        }
    }

    /// Attach `device` and start a fresh log in `name`
    ///
    /// The file is created if missing and truncated (unless disabled in the
    /// config), then everything buffered so far is flushed to it. A file
    /// still open on a previously attached device is closed first.
    pub fn begin(&mut self, device: D, name: FileName) -> Result<()> {
        self.release_file()?;
        info!(sectors = device.sector_count(), "Attached storage device");
        self.device = Some(device);
        self.open_file(name)
    }

    /// `begin` with the configured file name
    pub fn begin_default(&mut self, device: D) -> Result<()> {
        let name = self.config.file_name;
        self.begin(device, name)
    }

    /// Switch to buffer-only mode
    ///
    /// Any open file gets a final flush and is closed.
    pub fn begin_buffered(&mut self) -> Result<()> {
        self.detach().map(drop)
    }

    /// Close the open file, if any, and hand back the device
    pub fn detach(&mut self) -> Result<Option<D>> {
        if self.file.is_some() {
            self.close_file()?;
        }
        let device = self.device.take();
        if device.is_some() {
            info!("Detached storage device");
        }
        Ok(device)
    }

    /// Open `name` on the attached device and make it the log target
    ///
    /// A file that is still open is closed first. If that file is latched
    /// after a failure it gets no final flush; the buffered bytes go to
    /// `name` instead.
    pub fn open_file(&mut self, name: FileName) -> Result<()> {
        self.release_file()?;
        let device = self.device.as_mut().ok_or(LogError::NotAttached)?;

        let mut handle = match device.open(&name) {
            Ok(handle) => handle,
            Err(source) => {
                return Err(LogError::Open {
                    name,
                    fault: device.fault(),
                    source,
                })
            }
        };
        if self.config.truncate_on_open {
            handle
                .truncate(0)
                .map_err(|source| LogError::Truncate { name, source })?;
        }

        info!(file = %name, truncated = self.config.truncate_on_open, "Opened log file");
        self.file = Some(OpenFile { handle, name });
        self.flush()
    }

    /// Flush everything still buffered and close the log file
    ///
    /// If the final flush fails the file stays open, the unwritten bytes
    /// stay buffered and the logger is latched. A latched logger refuses to
    /// close; `open_file` or `begin` closes the file without the flush.
    pub fn close_file(&mut self) -> Result<()> {
        if self.file.is_none() {
            return Err(LogError::NotOpen);
        }
        self.flush_all()?;

        let Some(OpenFile { handle, name }) = self.file.take() else {
            return Err(LogError::NotOpen);
        };
        handle.close().map_err(|source| LogError::Close {
            name,
            fault: self.fault(),
            source,
        })?;
        info!(file = %name, "Closed log file");
        Ok(())
    }

    /// Rename the open log file; subsequent writes keep going to it
    pub fn rename_file(&mut self, name: FileName) -> Result<()> {
        let open = self.file.as_mut().ok_or(LogError::NotOpen)?;
        open.handle
            .rename(&name)
            .map_err(|source| LogError::Rename { name, source })?;
        info!(from = %open.name, to = %name, "Renamed log file");
        open.name = name;
        Ok(())
    }

    /// Move up to `C2` bytes from the primary buffer into the ready buffer
    ///
    /// Returns the number of bytes staged. Stops early when the ready buffer
    /// fills up or the primary buffer runs out (see `StageTermination`).
    pub fn prepare_buffer(&mut self) -> usize {
        let mut staged = 0;
        while staged < C2 && !self.ready_buffer.is_full() {
            let byte = match self.log_buffer.get() {
                None => break,
                Some(0) if self.config.staging == StageTermination::ZeroByte => break,
                Some(byte) => byte,
            };
            self.ready_buffer.put(byte);
            staged += 1;
        }
        trace!(staged, remaining = self.log_buffer.size(), "Staged log bytes");
        staged
    }

    /// Flush until both buffers are empty
    pub fn flush_all(&mut self) -> Result<()> {
        self.check_latch()?;
        while self.file.is_some()
            && !(self.ready_buffer.is_empty() && self.log_buffer.is_empty())
        {
            self.flush()?;
        }
        Ok(())
    }

    /// Returns true while a log file is open
    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    /// Returns true after a failed write or sync, until released
    pub fn is_latched(&self) -> bool {
        self.failed.is_some()
    }

    /// Name of the open log file
    pub fn file_name(&self) -> Option<FileName> {
        self.file.as_ref().map(|open| open.name)
    }

    /// Attached device, `None` in buffer-only mode
    pub fn device(&self) -> Option<&D> {
        self.device.as_ref()
    }

    /// Active configuration
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Read-only view of the primary buffer
    pub fn primary(&self) -> &RingBuffer<C1> {
        &self.log_buffer
    }

    /// Read-only view of the ready buffer
    pub fn ready(&self) -> &RingBuffer<C2> {
        &self.ready_buffer
    }

    fn fault(&self) -> Option<DeviceFault> {
        self.device.as_ref().and_then(|d| d.fault())
    }

    fn check_latch(&self) -> Result<()> {
        match self.failed {
            Some(failed) => Err(LogError::Latched { failed }),
            None => Ok(()),
        }
    }

    /// Close the current file, if any, before switching targets
    ///
    /// A latched file is closed without a final flush.
    fn release_file(&mut self) -> Result<()> {
        let Some(failed) = self.failed.take() else {
            return if self.file.is_some() {
                self.close_file()
            } else {
                Ok(())
            };
        };
        let Some(OpenFile { handle, name }) = self.file.take() else {
            return Ok(());
        };
        handle.close().map_err(|source| LogError::Close {
            name,
            fault: self.fault(),
            source,
        })?;
        warn!(file = %name, failed, "Closed log file without final flush");
        Ok(())
    }
}

/// Drain `buf` into `file`, then sync and reset it
///
/// The buffer is left untouched unless every byte was written and synced.
fn commit<F: StorageFile, const N: usize>(
    file: &mut F,
    buf: &mut RingBuffer<N>,
    which: &'static str,
    fault: impl Fn() -> Option<DeviceFault>,
) -> Result<()> {
    let drained = match drain(buf, |segment| file.write(segment)) {
        Ok(drained) => drained,
        Err(ShortDrain {
            written,
            expected,
            source,
        }) => {
            return Err(LogError::ShortWrite {
                which,
                written,
                expected,
                fault: fault(),
                source,
            })
        }
    };
    if drained.bytes == 0 {
        return Ok(());
    }

    file.flush().map_err(|source| LogError::Sync {
        fault: fault(),
        source,
    })?;
    buf.reset();
    debug!(
        which,
        bytes = drained.bytes,
        wrapped = drained.wrapped,
        "Drained buffer to log file"
    );
    Ok(())
}

impl<D: BlockDevice, const C1: usize, const C2: usize> LogSink
    for BufferedFileLogger<D, C1, C2>
{
    fn size(&self) -> u64 {
        self.file.as_ref().map_or(0, |open| open.handle.size())
    }

    fn capacity(&self) -> u64 {
        self.device.as_ref().map_or(0, |d| d.capacity_bytes())
    }

    #[inline]
    fn put_byte(&mut self, byte: u8) {
        self.log_buffer.put(byte);
    }

    fn flush(&mut self) -> Result<()> {
        if self.file.is_none() {
            return Ok(());
        }
        self.check_latch()?;
        let Some(open) = self.file.as_mut() else {
            return Ok(());
        };
        let device = self.device.as_ref();
        let fault = || device.and_then(|d| d.fault());

        let result = if !self.ready_buffer.is_empty() {
            commit(&mut open.handle, &mut self.ready_buffer, "ready", fault)
        } else {
            commit(&mut open.handle, &mut self.log_buffer, "primary", fault)
        };
        if let Err(err) = &result {
            self.failed = Some(match err {
                LogError::Sync { .. } => "sync",
                _ => "write",
            });
        }
        result
    }

    /// Drop both buffers and release a failure latch
    fn clear(&mut self) {
        self.log_buffer.reset();
        self.ready_buffer.reset();
        self.failed = None;
    }

    fn internal_size(&self) -> usize {
        self.log_buffer.size()
    }

    fn internal_capacity(&self) -> usize {
        self.log_buffer.capacity()
    }

    fn staging(&self) -> Option<BufferUsage> {
        Some(BufferUsage {
            size: self.ready_buffer.size(),
            capacity: self.ready_buffer.capacity(),
        })
    }
}

impl<D: BlockDevice, const C1: usize, const C2: usize> Default
    for BufferedFileLogger<D, C1, C2>
{
    fn default() -> Self {
        Self::new()
    }
}

impl<D: BlockDevice, const C1: usize, const C2: usize> fmt::Write
    for BufferedFileLogger<D, C1, C2>
{
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.put_bytes(s.as_bytes());
        Ok(())
    }
}

impl<D: BlockDevice, const C1: usize, const C2: usize> fmt::Debug
    for BufferedFileLogger<D, C1, C2>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedFileLogger")
            .field("attached", &self.device.is_some())
            .field("file", &self.file_name())
            .field("failed", &self.failed)
            .field("log_buffer", &self.log_buffer)
            .field("ready_buffer", &self.ready_buffer)
            .finish()
    }
}
